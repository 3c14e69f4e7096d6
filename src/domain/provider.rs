use crate::domain::status::DetailStatus;
use crate::error::{PayoutError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// A provider-originated status report, normalized by the inbound
/// collaborator (notification handler or poller) before it reaches the
/// reconciliation engine.
///
/// The target detail is addressed either by merchant numbers or by
/// provider-assigned ids; both forms may be present.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProviderUpdate {
    pub out_batch_no: Option<String>,
    pub out_detail_no: Option<String>,
    pub provider_batch_id: Option<String>,
    pub provider_detail_id: Option<String>,
    /// Raw provider status vocabulary; resolved via [`ProviderStatusMap`].
    pub status_code: String,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// The single place that couples provider status vocabulary to the internal
/// one. Everything else in the crate speaks [`DetailStatus`].
///
/// The table is configuration: build it with [`ProviderStatusMap::from_pairs`]
/// or start from [`ProviderStatusMap::wechat_pay_defaults`].
#[derive(Debug, Clone)]
pub struct ProviderStatusMap {
    map: HashMap<String, DetailStatus>,
}

impl ProviderStatusMap {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, DetailStatus)>) -> Self {
        Self {
            map: pairs.into_iter().collect(),
        }
    }

    /// The WeChat Pay batch-transfer detail vocabulary.
    pub fn wechat_pay_defaults() -> Self {
        Self::from_pairs([
            ("INIT".to_string(), DetailStatus::Init),
            ("WAIT_PAY".to_string(), DetailStatus::WaitPay),
            ("PROCESSING".to_string(), DetailStatus::Processing),
            ("SUCCESS".to_string(), DetailStatus::Success),
            ("FAIL".to_string(), DetailStatus::Fail),
            // A refunded detail is a failed transfer from the merchant's
            // point of view.
            ("REFUND".to_string(), DetailStatus::Fail),
        ])
    }

    /// Resolves a provider code. Unknown codes are a validation error so a
    /// vocabulary drift on the provider side surfaces immediately.
    pub fn resolve(&self, code: &str) -> Result<DetailStatus> {
        self.map.get(code).copied().ok_or_else(|| {
            PayoutError::ValidationError(format!("unknown provider status code: {code}"))
        })
    }
}

impl Default for ProviderStatusMap {
    fn default() -> Self {
        Self::wechat_pay_defaults()
    }
}

/// Serde shape for loading a custom status table from configuration.
#[derive(Debug, Deserialize)]
pub struct StatusMapConfig(pub HashMap<String, DetailStatus>);

impl From<StatusMapConfig> for ProviderStatusMap {
    fn from(config: StatusMapConfig) -> Self {
        Self { map: config.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_resolves_wechat_codes() {
        let map = ProviderStatusMap::default();
        assert_eq!(map.resolve("SUCCESS").unwrap(), DetailStatus::Success);
        assert_eq!(map.resolve("WAIT_PAY").unwrap(), DetailStatus::WaitPay);
        assert_eq!(map.resolve("REFUND").unwrap(), DetailStatus::Fail);
    }

    #[test]
    fn test_unknown_code_is_rejected() {
        let map = ProviderStatusMap::default();
        assert!(matches!(
            map.resolve("BANK_FAIL"),
            Err(PayoutError::ValidationError(_))
        ));
    }

    #[test]
    fn test_custom_table_from_config() {
        let config: StatusMapConfig =
            serde_json::from_str(r#"{"OK": "SUCCESS", "KO": "FAIL"}"#).unwrap();
        let map = ProviderStatusMap::from(config);
        assert_eq!(map.resolve("OK").unwrap(), DetailStatus::Success);
        assert_eq!(map.resolve("KO").unwrap(), DetailStatus::Fail);
        assert!(map.resolve("SUCCESS").is_err());
    }
}
