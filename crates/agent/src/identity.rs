// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Machine identifier sent to the relay on connect.

use std::path::Path;

use crate::error::IdentityError;

const NET_CLASS_DIR: &str = "/sys/class/net";
const MACHINE_ID_PATH: &str = "/etc/machine-id";

/// Resolve the identifier: an explicit override, else the first hardware
/// address, else the machine id.
pub fn resolve(override_id: Option<&str>) -> Result<String, IdentityError> {
    if let Some(id) = override_id.map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(id.to_owned());
    }
    resolve_from(Path::new(NET_CLASS_DIR), Path::new(MACHINE_ID_PATH))
}

pub fn resolve_from(net_dir: &Path, machine_id: &Path) -> Result<String, IdentityError> {
    if let Some(mac) = first_hardware_address(net_dir) {
        return Ok(mac);
    }
    match std::fs::read_to_string(machine_id) {
        Ok(id) if !id.trim().is_empty() => {
            tracing::debug!("no hardware address found, using machine id");
            Ok(id.trim().to_owned())
        }
        _ => Err(IdentityError),
    }
}

/// Interfaces are visited in name order; loopback is skipped.
fn first_hardware_address(net_dir: &Path) -> Option<String> {
    let mut names: Vec<String> = std::fs::read_dir(net_dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name != "lo")
        .collect();
    names.sort();

    names.into_iter().find_map(|name| {
        let raw = std::fs::read_to_string(net_dir.join(&name).join("address")).ok()?;
        normalize_mac(&raw)
    })
}

/// Lowercase `aa:bb:cc:dd:ee:ff`, or `None` for malformed or all-zero input.
pub fn normalize_mac(raw: &str) -> Option<String> {
    let mac = raw.trim().to_ascii_lowercase();
    let octets: Vec<&str> = mac.split(':').collect();
    let well_formed = octets.len() == 6
        && octets.iter().all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));
    if !well_formed || octets.iter().all(|o| *o == "00") {
        return None;
    }
    Some(mac)
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
