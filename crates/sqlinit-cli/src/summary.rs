use sqlinit_db::MigrationReport;

/// Print what a bootstrap run did.
pub fn print_report(database: &str, source: &str, report: &MigrationReport) {
    for line in render_report(database, source, report) {
        println!("{line}");
    }
}

fn render_report(database: &str, source: &str, report: &MigrationReport) -> Vec<String> {
    let row = |label: &str, value: &str| format!("{label:<10}{value}");

    let mut lines = vec![row("database", database), row("scripts", source)];
    if report.applied.is_empty() {
        lines.push(row("applied", "none"));
    } else {
        for (i, name) in report.applied.iter().enumerate() {
            lines.push(row(if i == 0 { "applied" } else { "" }, name));
        }
    }
    lines.push(row("skipped", &report.skipped.len().to_string()));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_each_applied_script() {
        let report = MigrationReport {
            applied: vec!["0001_init.sql".into(), "0002_seed.sql".into()],
            skipped: vec![],
        };
        let lines = render_report("db.sqlite", "embedded migrations", &report);
        assert_eq!(
            lines,
            vec![
                "database  db.sqlite",
                "scripts   embedded migrations",
                "applied   0001_init.sql",
                "          0002_seed.sql",
                "skipped   0",
            ]
        );
    }

    #[test]
    fn up_to_date_store_says_none() {
        let report = MigrationReport {
            applied: vec![],
            skipped: vec!["0001_init.sql".into()],
        };
        let lines = render_report("db.sqlite", "directory ./m", &report);
        assert_eq!(lines[2], "applied   none");
        assert_eq!(lines[3], "skipped   1");
    }
}
