// bases/device_renamer/src/host/powershell.rs
use super::{ChassisInfo, CloudJoinEntry, DomainMembership, HostPlatform};
use crate::error::{RenamerError, Result};
use crate::scheduler::{ScheduledTaskSpec, TaskTrigger};
use identity_primitives::CanonicalName;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const COMPUTER_NAME_KEY: &str =
    r"HKLM:\SYSTEM\CurrentControlSet\Control\ComputerName\ComputerName";

const ACTIVE_COMPUTER_NAME_KEY: &str =
    r"HKLM:\SYSTEM\CurrentControlSet\Control\ComputerName\ActiveComputerName";

const CLOUD_JOIN_KEY: &str = r"HKLM:\SYSTEM\CurrentControlSet\Control\CloudDomainJoin\JoinInfo";

/// shutdown.exe exit code when a restart is already pending
const SHUTDOWN_ALREADY_SCHEDULED: i32 = 1190;

/// Well-known SIDs: LocalSystem and BUILTIN\Administrators
const SYSTEM_SID: &str = "*S-1-5-18";
const ADMINISTRATORS_SID: &str = "*S-1-5-32-544";

/// Host implementation backed by Windows PowerShell and stock system tools
#[derive(Debug, Clone)]
pub struct PowerShellHost {
    program: String,
}

impl PowerShellHost {
    pub fn new() -> Self {
        Self {
            program: "powershell.exe".to_string(),
        }
    }

    /// Run a script and return its trimmed standard output
    async fn run(&self, operation: &str, script: &str) -> Result<String> {
        debug!("{}: {}", operation, script);

        // Stop turns any cmdlet error into a non-zero exit
        let script = format!("$ErrorActionPreference = 'Stop'; {script}");
        let output = Command::new(&self.program)
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
                script.as_str(),
            ])
            .output()
            .await
            .map_err(|e| RenamerError::command_failed(operation, e))?;

        if !output.status.success() {
            return Err(RenamerError::CommandExitCode {
                command: operation.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run_json<T: DeserializeOwned>(&self, operation: &str, script: &str) -> Result<T> {
        let stdout = self.run(operation, script).await?;
        serde_json::from_str(&stdout)
            .map_err(|e| RenamerError::unexpected_output(operation, format!("{e}: {stdout}")))
    }

    async fn run_bool(&self, operation: &str, script: &str) -> Result<bool> {
        let stdout = self.run(operation, script).await?;
        parse_bool(&stdout).ok_or_else(|| RenamerError::unexpected_output(operation, stdout))
    }

    async fn read_name(&self, operation: &str, key: &str) -> Result<String> {
        let script = format!(
            "(Get-ItemProperty -Path {} -Name ComputerName).ComputerName",
            quote(key)
        );
        let name = self.run(operation, &script).await?;
        if name.is_empty() {
            return Err(RenamerError::unexpected_output(operation, "empty computer name"));
        }
        Ok(name)
    }

    /// Run a plain executable, outside PowerShell
    async fn exec(&self, program: &str, args: &[&str]) -> Result<()> {
        self.exec_allowing(program, args, &[]).await
    }

    /// Like `exec`, also accepting the listed non-zero exit codes
    async fn exec_allowing(&self, program: &str, args: &[&str], accepted: &[i32]) -> Result<()> {
        debug!("{} {:?}", program, args);

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| RenamerError::command_failed(program, e))?;

        if let Some(code) = output.status.code().filter(|c| accepted.contains(c)) {
            debug!("{} exited with accepted code {}", program, code);
            return Ok(());
        }

        if !output.status.success() {
            return Err(RenamerError::CommandExitCode {
                command: format!("{program} {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

impl Default for PowerShellHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostPlatform for PowerShellHost {
    async fn computer_name(&self) -> Result<String> {
        self.read_name("read computer name", COMPUTER_NAME_KEY).await
    }

    async fn active_computer_name(&self) -> Result<String> {
        self.read_name("read active computer name", ACTIVE_COMPUTER_NAME_KEY).await
    }

    async fn hardware_tag(&self) -> Result<Option<String>> {
        let script = "$tag = (Get-CimInstance Win32_BIOS).SerialNumber; \
             if ([string]::IsNullOrWhiteSpace($tag)) { \
               $enclosure = Get-CimInstance Win32_SystemEnclosure | Select-Object -First 1; \
               $tag = $enclosure.SMBIOSAssetTag }; \
             $tag";
        let tag = self.run("read hardware serial", script).await?;
        Ok(non_blank(tag))
    }

    async fn chassis(&self) -> Result<ChassisInfo> {
        let script = "$enclosure = Get-CimInstance Win32_SystemEnclosure \
             | Select-Object -First 1; \
             $system = Get-CimInstance Win32_ComputerSystem; \
             [pscustomobject]@{ \
               ChassisTypes = @($enclosure.ChassisTypes | ForEach-Object { [int]$_ }); \
               Model = $system.Model } | ConvertTo-Json -Compress";
        self.run_json("read chassis", script).await
    }

    async fn domain_membership(&self) -> Result<DomainMembership> {
        let script = "$system = Get-CimInstance Win32_ComputerSystem; \
             [pscustomobject]@{ \
               PartOfDomain = [bool]$system.PartOfDomain; \
               Domain = $system.Domain } \
             | ConvertTo-Json -Compress";
        self.run_json("read domain membership", script).await
    }

    async fn probe_domain(&self, domain: &str) -> Result<bool> {
        let script = format!(
            "try {{ $root = [adsi]({}); [bool]$root.defaultNamingContext }} catch {{ $false }}",
            quote(&format!("LDAP://{domain}/RootDSE"))
        );
        self.run_bool("probe domain", &script).await
    }

    async fn cloud_join_entries(&self) -> Result<Vec<CloudJoinEntry>> {
        let script = format!(
            "$key = {}; $entries = @(); \
             if (Test-Path $key) {{ \
               $entries = @(Get-ChildItem -Path $key | ForEach-Object {{ \
                 [pscustomobject]@{{ \
                   Key = $_.PSChildName; \
                   TenantId = $_.GetValue('TenantId') }} }}) }}; \
             ConvertTo-Json -InputObject $entries -Compress",
            quote(CLOUD_JOIN_KEY)
        );
        let stdout = self.run("read cloud join entries", &script).await?;
        if stdout.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&stdout).map_err(|e| {
            RenamerError::unexpected_output("read cloud join entries", format!("{e}: {stdout}"))
        })
    }

    async fn session_user(&self) -> Result<Option<String>> {
        let user = self
            .run(
                "read session user",
                "(Get-CimInstance Win32_ComputerSystem).UserName",
            )
            .await?;
        Ok(non_blank(user))
    }

    async fn rename_computer(&self, name: &CanonicalName) -> Result<()> {
        let script = format!("Rename-Computer -NewName {} -Force", quote(name.as_str()));
        self.run("rename computer", &script).await?;
        Ok(())
    }

    async fn schedule_restart(&self, grace: Duration, message: &str) -> Result<()> {
        let seconds = grace.as_secs().to_string();
        self.exec_allowing(
            "shutdown.exe",
            &["/r", "/t", seconds.as_str(), "/c", message],
            &[SHUTDOWN_ALREADY_SCHEDULED],
        )
        .await
    }

    async fn task_exists(&self, name: &str) -> Result<bool> {
        let script = format!(
            "[bool](Get-ScheduledTask -TaskName {} -ErrorAction SilentlyContinue)",
            quote(name)
        );
        self.run_bool("query scheduled task", &script).await
    }

    async fn register_task(&self, spec: &ScheduledTaskSpec) -> Result<()> {
        self.run("register scheduled task", &register_task_script(spec))
            .await?;
        Ok(())
    }

    async fn restrict_directory(&self, dir: &Path) -> Result<()> {
        let dir = dir.to_string_lossy();
        let system = format!("{SYSTEM_SID}:(OI)(CI)F");
        let administrators = format!("{ADMINISTRATORS_SID}:(OI)(CI)F");
        self.exec(
            "icacls.exe",
            &[
                &*dir,
                "/inheritance:r",
                "/grant:r",
                system.as_str(),
                "/grant:r",
                administrators.as_str(),
            ],
        )
        .await
    }
}

/// Single-quoted PowerShell string literal
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim() {
        v if v.eq_ignore_ascii_case("true") => Some(true),
        v if v.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn trigger_expression(trigger: &TaskTrigger) -> String {
    match trigger {
        TaskTrigger::Daily { at } => format!(
            "New-ScheduledTaskTrigger -Daily -At {}",
            quote(&at.format("%H:%M").to_string())
        ),
        TaskTrigger::AtLogon { random_delay } => format!(
            "New-ScheduledTaskTrigger -AtLogOn -RandomDelay (New-TimeSpan -Seconds {})",
            random_delay.as_secs()
        ),
        TaskTrigger::AtStartup { random_delay } => format!(
            "New-ScheduledTaskTrigger -AtStartup -RandomDelay (New-TimeSpan -Seconds {})",
            random_delay.as_secs()
        ),
    }
}

fn register_task_script(spec: &ScheduledTaskSpec) -> String {
    let mut action = format!(
        "New-ScheduledTaskAction -Execute {}",
        quote(&spec.program.to_string_lossy())
    );
    if !spec.arguments.is_empty() {
        action.push_str(&format!(" -Argument {}", quote(&spec.arguments.join(" "))));
    }

    let triggers = spec
        .triggers
        .iter()
        .map(|t| format!("({})", trigger_expression(t)))
        .collect::<Vec<_>>()
        .join(", ");

    let run_level = if spec.principal.highest_privileges {
        "Highest"
    } else {
        "Limited"
    };

    format!(
        "$action = {action}; \
         $triggers = @({triggers}); \
         $principal = New-ScheduledTaskPrincipal -UserId {} \
           -LogonType ServiceAccount -RunLevel {run_level}; \
         Register-ScheduledTask -TaskName {} \
           -Action $action -Trigger $triggers -Principal $principal | Out-Null",
        quote(&spec.principal.user_id),
        quote(&spec.name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{TaskPrincipal, TASK_NAME};
    use chrono::NaiveTime;
    use std::path::PathBuf;

    #[test]
    fn quote_escapes_single_quotes() {
        assert_eq!(quote("O'Brien"), "'O''Brien'");
        assert_eq!(quote(r"C:\Program Files"), r"'C:\Program Files'");
    }

    #[test]
    fn parse_bool_accepts_powershell_output() {
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("False\r"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn blank_output_is_none() {
        assert_eq!(non_blank("  ".to_string()), None);
        assert_eq!(non_blank("PF3KX99".to_string()), Some("PF3KX99".to_string()));
    }

    #[test]
    fn chassis_json_parses() {
        let info: ChassisInfo =
            serde_json::from_str(r#"{"ChassisTypes":[10],"Model":"Latitude 7420"}"#).unwrap();
        assert_eq!(info.chassis_types, vec![10]);
        assert_eq!(info.model.as_deref(), Some("Latitude 7420"));
    }

    #[test]
    fn cloud_join_json_parses() {
        let json = concat!(
            r#"[{"Key":"6F2C...","TenantId":"8a1f0c2e-0000-4000-8000-000000000001"},"#,
            r#"{"Key":"X","TenantId":null}]"#,
        );
        let entries: Vec<CloudJoinEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].tenant_id, None);
    }

    #[test]
    fn register_script_has_three_triggers_and_system_principal() {
        let spec = ScheduledTaskSpec {
            name: TASK_NAME.to_string(),
            program: PathBuf::from(r"C:\ProgramData\DeviceRenamer\rename-device.exe"),
            arguments: Vec::new(),
            triggers: vec![
                TaskTrigger::Daily {
                    at: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                },
                TaskTrigger::AtLogon {
                    random_delay: Duration::from_secs(300),
                },
                TaskTrigger::AtStartup {
                    random_delay: Duration::from_secs(300),
                },
            ],
            principal: TaskPrincipal::local_system(),
        };

        let script = register_task_script(&spec);
        assert!(script.contains("-Daily -At '12:00'"));
        assert!(script.contains("-AtLogOn -RandomDelay (New-TimeSpan -Seconds 300)"));
        assert!(script.contains("-AtStartup -RandomDelay (New-TimeSpan -Seconds 300)"));
        assert!(script.contains("-UserId 'SYSTEM'"));
        assert!(script.contains("-RunLevel Highest"));
        assert!(script.contains(&format!("-TaskName '{TASK_NAME}'")));
        assert!(!script.contains("-Argument"));
    }
}
