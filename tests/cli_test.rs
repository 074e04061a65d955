use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

#[test]
fn test_report_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("kashela"));
    cmd.arg("report").arg("tests/fixtures/report.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "total_income,total_expenses,net_balance,profit_margin\n1000,300,700,70",
        ))
        .stdout(predicate::str::contains("category,expense\nFood,200\nTransport,100"))
        .stdout(predicate::str::contains(
            "monthly,income,expenses\n2024-01,1000,250\n2024-02,0,50",
        ));

    Ok(())
}

#[test]
fn test_report_weekly_income_categories() {
    let mut cmd = Command::new(cargo_bin!("kashela"));
    cmd.args([
        "report",
        "tests/fixtures/report.csv",
        "--period",
        "weekly",
        "--category-type",
        "income",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("category,income\nSalary,1000"))
        // Sunday 2024-01-07 belongs to the week of Monday 2024-01-01.
        .stdout(predicate::str::contains(
            "weekly,income,expenses\n2024-01-01,1000,250\n2024-02-05,0,50",
        ));
}

#[test]
fn test_report_skips_malformed_rows() {
    let mut csv = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv, "Date,Type,Category,Description,Amount,Reference").unwrap();
    writeln!(csv, "2024-03-01,income,Salary,,400,").unwrap();
    writeln!(csv, "2024-03-02,transfer,Food,,10,").unwrap();
    writeln!(csv, "2024-03-03,expense,Food,,-5,").unwrap();
    writeln!(csv, "not-a-date,expense,Food,,5,").unwrap();
    writeln!(csv, "2024-03-04,expense,Food,,100,").unwrap();

    let mut cmd = Command::new(cargo_bin!("kashela"));
    cmd.arg("report").arg(csv.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading transaction"))
        .stdout(predicate::str::contains("400,100,300,75"));
}

#[test]
fn test_report_export_writes_file() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::new(cargo_bin!("kashela"));
    cmd.arg("report")
        .arg("tests/fixtures/report.csv")
        .arg("--export")
        .arg(dir.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("exported"));

    let exported: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(exported.len(), 1);

    let name = exported[0].file_name().unwrap().to_string_lossy().to_string();
    let today = chrono::Utc::now().date_naive();
    let yesterday = today.pred_opt().unwrap();
    assert!(
        name == format!("financial-report-{today}.csv")
            || name == format!("financial-report-{yesterday}.csv"),
        "{name}"
    );

    let content = std::fs::read_to_string(&exported[0]).unwrap();
    assert!(content.starts_with("Date,Type,Category,Description,Amount,Reference\n"));
    assert!(content.contains("2024-02-10,expense,Food,\"Groceries, weekly\",50,R-77"));
    assert!(!content.ends_with('\n'));
}

#[test]
fn test_report_missing_file_fails() {
    let mut cmd = Command::new(cargo_bin!("kashela"));
    cmd.arg("report").arg("tests/fixtures/does-not-exist.csv");

    cmd.assert().failure();
}

#[test]
fn test_pay_mpesa_instant() {
    let mut cmd = Command::new(cargo_bin!("kashela"));
    cmd.args([
        "pay",
        "--instant",
        "--pending-polls",
        "2",
        "mpesa",
        "--amount",
        "500",
        "--phone",
        "+254 700 000 000",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("MOCK_00000001 pending_confirmation"))
        .stdout(predicate::str::contains("MOCK_00000001 completed"))
        .stdout(predicate::str::contains(r#""status":"completed""#))
        .stdout(predicate::str::contains(
            "income,Payments,mpesa payment,500,MOCK_00000001",
        ));
}

#[test]
fn test_pay_mpesa_times_out_with_small_budget() {
    let mut cmd = Command::new(cargo_bin!("kashela"));
    cmd.args([
        "pay",
        "--instant",
        "--pending-polls",
        "5",
        "--max-poll-attempts",
        "3",
        "mpesa",
        "--amount",
        "500",
        "--phone",
        "254700000000",
    ]);

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains(r#""status":"timed_out""#))
        .stdout(predicate::str::contains("Payments").not());
}

#[test]
fn test_pay_bank_instant() {
    let mut cmd = Command::new(cargo_bin!("kashela"));
    cmd.args([
        "pay",
        "--instant",
        "bank",
        "--amount",
        "1200.50",
        "--bank-name",
        "Equity Bank",
        "--account-number",
        "0123456789",
        "--account-name",
        "Jane Wanjiru",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("MOCK_00000001 awaiting_delay"))
        .stdout(predicate::str::contains("income,Payments,bank payment,1200.5,MOCK_00000001"));
}

#[test]
fn test_pay_survives_huge_poll_interval() {
    let mut cmd = Command::new(cargo_bin!("kashela"));
    cmd.args([
        "pay",
        "--instant",
        "--poll-interval-secs",
        "18446744073709551615",
        "mpesa",
        "--amount",
        "100",
        "--phone",
        "254700000000",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#""status":"completed""#))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn test_pay_rejects_zero_amount() {
    let mut cmd = Command::new(cargo_bin!("kashela"));
    cmd.args([
        "pay", "--instant", "mpesa", "--amount", "0", "--phone", "254700000000",
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Payment amount must be positive"));
}
