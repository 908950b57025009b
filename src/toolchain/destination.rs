use crate::build::Sdk;
use crate::result::{ForgeError, Result};
use crate::utils::process::{CommandRunner, Invocation};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;

static RUNTIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"SimRuntime\.(iOS|tvOS|watchOS)-([0-9]+(?:-[0-9]+)*)$").expect("static regex")
});

#[derive(Debug, Deserialize)]
struct DeviceList {
    devices: HashMap<String, Vec<DeviceEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceEntry {
    udid: String,
    name: String,
    #[serde(default = "available_by_default")]
    is_available: bool,
}

fn available_by_default() -> bool {
    true
}

/// A simulator device together with its runtime platform and OS version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simulator {
    pub udid: String,
    pub name: String,
    pub platform: String,
    pub version: Vec<u32>,
}

/// Parses `xcrun simctl list -j devices` output into available simulators.
pub fn parse_simctl_devices(json: &str) -> Result<Vec<Simulator>> {
    let list: DeviceList = serde_json::from_str(json)?;
    let mut simulators = Vec::new();

    for (runtime, devices) in list.devices {
        let Some(caps) = RUNTIME_RE.captures(&runtime) else {
            continue;
        };
        let platform = caps[1].to_string();
        let version = parse_version(&caps[2].replace('-', "."));

        for device in devices.into_iter().filter(|d| d.is_available) {
            simulators.push(Simulator {
                udid: device.udid,
                name: device.name,
                platform: platform.clone(),
                version: version.clone(),
            });
        }
    }

    // HashMap order is arbitrary; keep selection deterministic.
    simulators.sort_by(|a, b| {
        compare_versions(&a.version, &b.version)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.udid.cmp(&b.udid))
    });
    Ok(simulators)
}

pub fn parse_version(text: &str) -> Vec<u32> {
    text.split('.')
        .map(|part| part.trim().parse::<u32>().unwrap_or(0))
        .collect()
}

/// Compares dotted versions, treating missing components as zero.
pub fn compare_versions(a: &[u32], b: &[u32]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// The oldest simulator for `platform` whose OS is at least `minimum`.
pub fn pick_oldest<'a>(
    simulators: &'a [Simulator],
    platform: &str,
    minimum: Option<&str>,
) -> Option<&'a Simulator> {
    let minimum = minimum.map(parse_version);
    simulators
        .iter()
        .filter(|s| s.platform == platform)
        .filter(|s| {
            minimum
                .as_ref()
                .map_or(true, |min| compare_versions(&s.version, min) != Ordering::Less)
        })
        .min_by(|a, b| compare_versions(&a.version, &b.version))
}

/// Selects concrete simulator destinations through `simctl`.
#[derive(Debug, Default, Clone)]
pub struct SimulatorCatalog;

impl SimulatorCatalog {
    pub fn new() -> Self {
        Self
    }

    /// `-destination id=<udid>` arguments for a simulator SDK; empty for device SDKs.
    pub async fn destination_args<R: CommandRunner>(
        &self,
        runner: &R,
        sdk: Sdk,
        deployment_target: Option<&str>,
    ) -> Result<Vec<String>> {
        let Some(platform) = sdk.simulator_platform() else {
            return Ok(Vec::new());
        };

        let output = runner
            .run_checked(
                &Invocation::new("xcrun")
                    .args(["simctl", "list", "-j", "devices", "available"])
                    .capture_stdout(),
            )
            .await?;
        let simulators = parse_simctl_devices(&output.stdout)?;

        let device = pick_oldest(&simulators, platform, deployment_target).ok_or_else(|| {
            ForgeError::NotFound(
                format!(
                    "No {} simulator found for deployment target {}",
                    platform,
                    deployment_target.unwrap_or("any")
                )
                .into(),
            )
        })?;

        log::info!(
            "Using {} {} simulator {} ({})",
            platform,
            device
                .version
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join("."),
            device.name,
            device.udid
        );

        Ok(vec!["-destination".to_string(), format!("id={}", device.udid)])
    }
}

#[cfg(test)]
pub(crate) const SAMPLE_SIMCTL: &str = r#"{
  "devices": {
    "com.apple.CoreSimulator.SimRuntime.iOS-16-4": [
      { "udid": "IOS-16", "name": "iPhone 14", "isAvailable": true, "state": "Shutdown" }
    ],
    "com.apple.CoreSimulator.SimRuntime.iOS-14-5": [
      { "udid": "IOS-14", "name": "iPhone 8", "isAvailable": true, "state": "Shutdown" },
      { "udid": "IOS-14-BROKEN", "name": "iPhone 7", "isAvailable": false, "state": "Shutdown" }
    ],
    "com.apple.CoreSimulator.SimRuntime.iOS-12-4": [
      { "udid": "IOS-12", "name": "iPhone 6s", "isAvailable": true, "state": "Shutdown" }
    ],
    "com.apple.CoreSimulator.SimRuntime.tvOS-15-0": [
      { "udid": "TV-15", "name": "Apple TV", "isAvailable": true, "state": "Shutdown" }
    ],
    "com.apple.CoreSimulator.SimRuntime.xrOS-1-0": [
      { "udid": "XR-1", "name": "Apple Vision Pro", "isAvailable": true, "state": "Shutdown" }
    ]
  }
}"#;
