//! Latest-firmware lookup for Ubiquiti UniFi access points.
//!
//! One GET against the vendor's firmware API, then a lookup of the first
//! release-channel entry for the device's platform. Failures come back as
//! [`Error::Firmware`]; the probe turns them into an UNKNOWN verdict.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::verdict::{Report, Verdict};

/// Vendor endpoint listing the latest firmware per platform and channel.
pub const UNIFI_RELEASES_URL: &str = "https://fw-update.ubnt.com/api/firmware-latest";

/// Channel the probe compares against.
pub const RELEASE_CHANNEL: &str = "release";

/// Marketing model name to firmware platform.
///
/// Models missing here are looked up under their own upper-cased name.
pub const UNIFI_IDENTIFIERS: &[(&str, &str)] = &[
    ("UAP-AC-EDU", "U7PG2"),
    ("UAP-AC-IW", "U7PG2"),
    ("UAP-AC-IW-PRO", "U7PG2"),
    ("UAP-AC-LITE", "U7PG2"),
    ("UAP-AC-LR", "U7PG2"),
    ("UAP-AC-M", "U7PG2"),
    ("UAP-AC-M-PRO", "U7PG2"),
    ("UAP-AC-PRO", "U7PG2"),
    ("UAP-AC-PRO-GEN2", "U7PG2"),
    ("UA-FLEXHD", "U7NHD"),
    ("UAP-BEACONHD", "U7NHD"),
    ("UAP-IW-HD", "U7NHD"),
    ("UAP-NANOHD", "U7NHD"),
    ("UAP-IW", "U2IW"),
    ("UAP-OUTDOOR+", "U2HSR"),
    ("UAP-HD", "U7HD"),
    ("UAP-SHD", "U7HD"),
    ("UAP-XG", "U7HD"),
    ("UWB-XG", "U7HD"),
    ("UWB-XG-BK", "U7HD"),
    ("UAP", "BZ2"),
    ("UAP-LR", "BZ2"),
    ("UAP-OUTDOOR", "BZ2"),
    ("UAP-OUTDOOR5", "BZ2"),
    ("UAP-V2", "U2SV2"),
    ("UAP-LR-V2", "U2SV2"),
    ("UAP-PRO", "U7P"),
];

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// One entry of the firmware listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FirmwareEntry {
    pub channel: String,
    pub platform: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
struct FirmwareListing {
    #[serde(rename = "_embedded")]
    embedded: Embedded,
}

#[derive(Debug, Deserialize)]
struct Embedded {
    firmware: Vec<FirmwareEntry>,
}

fn firmware_error(message: impl Into<String>) -> Error {
    Error::Firmware {
        message: message.into(),
    }
}

/// Firmware platform for a model name (case-insensitive).
pub fn platform_identifier(model: &str) -> String {
    let model = model.to_uppercase();
    UNIFI_IDENTIFIERS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, platform)| platform.to_string())
        .unwrap_or(model)
}

/// Strip letters and turn build separators into dots.
///
/// ```
/// use snmp_probe::firmware::normalize_version;
///
/// assert_eq!(normalize_version("BZ.qca956x.v4.3.20.11298"), ".956.4.3.20.11298");
/// assert_eq!(normalize_version("4.3.20+11298"), "4.3.20.11298");
/// ```
pub fn normalize_version(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_ascii_alphabetic())
        .map(|c| if c == '+' { '.' } else { c })
        .collect()
}

/// Pick the latest release version for `model` out of a listing body.
pub fn select_latest_version(body: &str, model: &str) -> Result<String> {
    let listing: FirmwareListing = serde_json::from_str(body).map_err(|e| firmware_error(e.to_string()))?;
    let platform = platform_identifier(model);

    listing
        .embedded
        .firmware
        .into_iter()
        .find(|entry| entry.channel == RELEASE_CHANNEL && entry.platform == platform)
        .map(|entry| entry.version)
        .ok_or_else(|| firmware_error(format!("Unable to find updates for device: {}", model)))
}

/// HTTP client for the firmware API.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("snmp-probe/", env!("CARGO_PKG_VERSION")))
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| firmware_error(format!("Failed to create HTTP client: {}", e)))
}

/// Fetch the listing at `url` and return the latest release for `model`.
pub async fn fetch_latest_version(client: &reqwest::Client, url: &str, model: &str) -> Result<String> {
    tracing::debug!(target: "snmp_probe::firmware", { url, model }, "fetching firmware listing");
    let body = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| firmware_error(e.to_string()))?
        .text()
        .await
        .map_err(|e| firmware_error(e.to_string()))?;

    let version = select_latest_version(&body, model)?;
    tracing::debug!(target: "snmp_probe::firmware", { model, version = %version }, "latest firmware");
    Ok(version)
}

/// OK when the installed version equals the latest, WARNING otherwise.
pub fn compare_firmware(installed: &str, latest: &str, service: &str) -> Report {
    if installed == latest {
        Report::new(
            Verdict::Ok,
            format!("{} {} - Firmware {} is current", service, Verdict::Ok, installed),
        )
    } else {
        Report::new(
            Verdict::Warning,
            format!(
                "{} {} - firmware version {} differs from the latest available {}",
                service,
                Verdict::Warning,
                installed,
                latest
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const LISTING: &str = r#"{
        "_embedded": {
            "firmware": [
                {"channel": "beta", "platform": "U7PG2", "version": "v6.6.0+14000", "id": "a"},
                {"channel": "release", "platform": "U7PG2", "version": "v6.5.62+14071", "id": "b"},
                {"channel": "release", "platform": "BZ2", "version": "v4.3.28+11361", "id": "c"}
            ]
        }
    }"#;

    #[test]
    fn test_platform_identifier() {
        assert_eq!(platform_identifier("uap-ac-lite"), "U7PG2");
        assert_eq!(platform_identifier("UAP"), "BZ2");
        assert_eq!(platform_identifier("u6-lite"), "U6-LITE");
    }

    #[test]
    fn test_normalize_version() {
        assert_eq!(normalize_version("v6.5.62+14071"), "6.5.62.14071");
        assert_eq!(normalize_version("6.5.62.14071"), "6.5.62.14071");
    }

    #[test]
    fn test_select_release_for_platform() {
        assert_eq!(select_latest_version(LISTING, "UAP-AC-PRO").unwrap(), "v6.5.62+14071");
        assert_eq!(select_latest_version(LISTING, "uap-lr").unwrap(), "v4.3.28+11361");
    }

    #[test]
    fn test_select_missing_platform() {
        let err = select_latest_version(LISTING, "UAP-HD").unwrap_err();
        assert_eq!(err.to_string(), "Unable to find updates for device: UAP-HD");
    }

    #[test]
    fn test_select_malformed_body() {
        assert!(matches!(
            select_latest_version("{\"firmware\": []}", "UAP"),
            Err(Error::Firmware { .. })
        ));
        assert!(select_latest_version("<html>", "UAP").is_err());
    }

    #[test]
    fn test_compare_messages() {
        let ok = compare_firmware("6.5.62.14071", "6.5.62.14071", "UniFi AP");
        assert_eq!(ok.verdict, Verdict::Ok);
        assert_eq!(ok.message, "UniFi AP OK - Firmware 6.5.62.14071 is current");

        let outdated = compare_firmware("6.2.26.10348", "6.5.62.14071", "UniFi AP");
        assert_eq!(outdated.exit_code(), 1);
        assert_eq!(
            outdated.message,
            "UniFi AP WARNING - firmware version 6.2.26.10348 differs from the latest available 6.5.62.14071"
        );
    }

    /// Serve one canned HTTP response on a local port.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = stream.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });
        format!("http://{}/api/firmware-latest", addr)
    }

    #[tokio::test]
    async fn test_fetch_latest_version() {
        let url = serve_once("200 OK", LISTING).await;
        let client = http_client().unwrap();
        let version = fetch_latest_version(&client, &url, "UAP-AC-LITE").await.unwrap();
        assert_eq!(normalize_version(&version), "6.5.62.14071");
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let url = serve_once("503 Service Unavailable", "{}").await;
        let client = http_client().unwrap();
        let err = fetch_latest_version(&client, &url, "UAP").await.unwrap_err();
        assert!(matches!(err, Error::Firmware { .. }));
    }
}
