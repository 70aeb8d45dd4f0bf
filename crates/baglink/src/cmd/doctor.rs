use serde::Serialize;

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(_args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let checks = vec![
        bluetooth_adapter_check(),
        rfcomm_socket_check(),
        temp_dir_writable_check(),
    ];

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput { checks, overall };
    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn bluetooth_adapter_check() -> CheckResult {
    let adapters = std::fs::read_dir("/sys/class/bluetooth")
        .map(|entries| entries.count())
        .unwrap_or(0);
    if adapters > 0 {
        CheckResult {
            name: "bluetooth_adapter".to_string(),
            status: CheckStatus::Pass,
            detail: format!("{adapters} adapter(s) present"),
        }
    } else {
        CheckResult {
            name: "bluetooth_adapter".to_string(),
            status: CheckStatus::Warn,
            detail: "no bluetooth adapter found; only local endpoints will work".to_string(),
        }
    }
}

fn rfcomm_socket_check() -> CheckResult {
    if baglink_transport::rfcomm_supported() {
        CheckResult {
            name: "rfcomm_socket".to_string(),
            status: CheckStatus::Pass,
            detail: "kernel accepts RFCOMM sockets".to_string(),
        }
    } else {
        CheckResult {
            name: "rfcomm_socket".to_string(),
            status: CheckStatus::Warn,
            detail: "RFCOMM sockets unavailable; only local endpoints will work".to_string(),
        }
    }
}

fn temp_dir_writable_check() -> CheckResult {
    let path = std::env::temp_dir().join(format!("baglink-doctor-{}", std::process::id()));
    let result = std::fs::write(&path, b"probe").and_then(|()| std::fs::remove_file(&path));
    match result {
        Ok(()) => CheckResult {
            name: "temp_dir_writable".to_string(),
            status: CheckStatus::Pass,
            detail: std::env::temp_dir().display().to_string(),
        },
        Err(err) => CheckResult {
            name: "temp_dir_writable".to_string(),
            status: CheckStatus::Fail,
            detail: format!("cannot write to temp dir: {err}"),
        },
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("baglink doctor\n");
            for check in &output.checks {
                println!("  [{:?}] {}: {}", check.status, check.name, check.detail);
            }
            println!("\noverall: {}", output.overall);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_check_passes_locally() {
        let check = temp_dir_writable_check();
        assert!(matches!(check.status, CheckStatus::Pass));
    }
}
