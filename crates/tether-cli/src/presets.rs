//! Credential presets offered by the CLI
//!
//! The provisioning core never picks rights on its own; these are the sets
//! a Basics Station gateway needs.

use chrono::NaiveDate;
use tether_core::{CredentialKind, CredentialRequest, RightSet};

/// Rights for the LNS link key
pub const LNS_RIGHTS: &[&str] = &["RIGHT_GATEWAY_LINK"];

/// Rights for the CUPS key
pub const CUPS_RIGHTS: &[&str] = &[
    "RIGHT_GATEWAY_INFO",
    "RIGHT_GATEWAY_SETTINGS_BASIC",
    "RIGHT_GATEWAY_READ_SECRETS",
];

/// Preset rights for a credential kind
pub fn rights_for(kind: CredentialKind) -> RightSet {
    match kind {
        CredentialKind::Lns => RightSet::new(LNS_RIGHTS.iter().copied()),
        CredentialKind::Cups => RightSet::new(CUPS_RIGHTS.iter().copied()),
    }
}

/// `"<prefix> LNS Key - YYYYMMDD"`
pub fn key_label(prefix: &str, kind: CredentialKind, date: NaiveDate) -> String {
    format!("{prefix} {kind} Key - {}", date.format("%Y%m%d"))
}

/// Preset request for one credential kind
pub fn credential_request(kind: CredentialKind, prefix: &str, date: NaiveDate) -> CredentialRequest {
    CredentialRequest::new(kind, key_label(prefix, kind, date), rights_for(kind))
}

/// Requests for the selected kinds, LNS first
pub fn requested_credentials(
    lns: bool,
    cups: bool,
    prefix: &str,
    date: NaiveDate,
) -> Vec<CredentialRequest> {
    [(lns, CredentialKind::Lns), (cups, CredentialKind::Cups)]
        .into_iter()
        .filter(|(wanted, _)| *wanted)
        .map(|(_, kind)| credential_request(kind, prefix, date))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()
    }

    #[test]
    fn test_label_format() {
        assert_eq!(
            key_label("Tether", CredentialKind::Lns, date()),
            "Tether LNS Key - 20260307"
        );
        assert_eq!(
            key_label("Cold Chain", CredentialKind::Cups, date()),
            "Cold Chain CUPS Key - 20260307"
        );
    }

    #[test]
    fn test_cups_preset_rights() {
        let rights = rights_for(CredentialKind::Cups);
        assert_eq!(rights.len(), 3);
        assert!(rights.iter().any(|r| r == "RIGHT_GATEWAY_READ_SECRETS"));
    }

    #[test]
    fn test_requested_credentials_order() {
        let requests = requested_credentials(true, true, "Tether", date());
        let kinds: Vec<_> = requests.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![CredentialKind::Lns, CredentialKind::Cups]);
        assert!(requested_credentials(false, false, "Tether", date()).is_empty());
    }
}
