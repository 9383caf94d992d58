use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::OnceCell;

use super::error::EstimationError;
use crate::config::CurrencyConfig;

/// Units of `target` per one unit of `base`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeRate {
    base: String,
    target: String,
    rate: f64,
}

impl ExchangeRate {
    pub fn new(
        base: impl Into<String>,
        target: impl Into<String>,
        rate: f64,
    ) -> Result<Self, EstimationError> {
        let base = base.into();
        let target = target.into();
        if !rate.is_finite() || rate <= 0.0 {
            return Err(EstimationError::Parse(format!(
                "exchange rate {base}->{target} must be positive, got {rate}"
            )));
        }
        Ok(Self { base, target, rate })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn convert(&self, amount: f64, direction: ConversionDirection) -> f64 {
        match direction {
            ConversionDirection::BaseToTarget => amount * self.rate,
            ConversionDirection::TargetToBase => amount / self.rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionDirection {
    BaseToTarget,
    TargetToBase,
}

/// Outcome of a conversion request. `Pending` is never a number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "amount", rename_all = "snake_case")]
pub enum Conversion {
    Pending,
    Amount(f64),
}

impl Conversion {
    pub fn amount(self) -> Option<f64> {
        match self {
            Self::Pending => None,
            Self::Amount(amount) => Some(amount),
        }
    }

    pub fn display(self, code: &str) -> String {
        match self {
            Self::Pending => "pending".to_string(),
            Self::Amount(amount) => format_amount(amount, code),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RateStatus {
    Loading,
    Ready(ExchangeRate),
    Failed(EstimationError),
}

impl RateStatus {
    pub fn ready(&self) -> Option<&ExchangeRate> {
        match self {
            Self::Ready(rate) => Some(rate),
            Self::Loading | Self::Failed(_) => None,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

/// Fetches the current rate for a currency pair. One attempt per call.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rate(&self, base: &str, target: &str) -> Result<ExchangeRate, EstimationError>;
}

type RateCell = OnceCell<Result<ExchangeRate, EstimationError>>;

/// Session-scoped converter. The rate is fetched on first need; concurrent
/// callers await the same in-flight request and share its outcome.
pub struct CurrencyConverter {
    source: Arc<dyn RateSource>,
    base: String,
    target: String,
    cell: Mutex<Arc<RateCell>>,
}

impl CurrencyConverter {
    pub fn new(source: Arc<dyn RateSource>, currency: &CurrencyConfig) -> Self {
        Self {
            source,
            base: currency.base.clone(),
            target: currency.target.clone(),
            cell: Mutex::new(Arc::new(OnceCell::new())),
        }
    }

    pub fn base_currency(&self) -> &str {
        &self.base
    }

    pub fn target_currency(&self) -> &str {
        &self.target
    }

    fn current(&self) -> Arc<RateCell> {
        self.cell
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn rate_status(&self) -> RateStatus {
        match self.current().get() {
            None => RateStatus::Loading,
            Some(Ok(rate)) => RateStatus::Ready(rate.clone()),
            Some(Err(err)) => RateStatus::Failed(err.clone()),
        }
    }

    /// Resolves the rate, fetching it if nobody has yet.
    pub async fn ensure_rate(&self) -> Result<ExchangeRate, EstimationError> {
        let cell = self.current();
        let pending = cell.get_or_init(|| async {
            let outcome = self.source.fetch_rate(&self.base, &self.target).await;
            match &outcome {
                Ok(rate) => tracing::info!(
                    base = %rate.base(),
                    target = %rate.target(),
                    rate = rate.rate(),
                    "exchange rate fetched"
                ),
                Err(err) => tracing::warn!(error = %err, "exchange rate fetch failed"),
            }
            outcome
        });
        pending.await.clone()
    }

    pub fn convert(&self, amount: f64, direction: ConversionDirection) -> Conversion {
        match self.rate_status() {
            RateStatus::Ready(rate) => Conversion::Amount(rate.convert(amount, direction)),
            RateStatus::Loading | RateStatus::Failed(_) => Conversion::Pending,
        }
    }

    /// Clears a failed fetch so the next need re-fetches. Returns whether
    /// anything was cleared; a ready or in-flight rate is left alone.
    pub fn retry(&self) -> bool {
        let mut cell = self.cell.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(cell.get(), Some(Err(_))) {
            *cell = Arc::new(OnceCell::new());
            tracing::info!("exchange rate cleared for retry");
            true
        } else {
            false
        }
    }
}

/// Whole units grouped by thousands with a space: `485 000 EUR`.
pub fn format_amount(amount: f64, code: &str) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(digit);
    }
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}{grouped} {code}")
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// Answers after a short delay so concurrent callers overlap.
    pub(crate) struct SlowRateSource {
        replies: Mutex<Vec<Result<f64, EstimationError>>>,
        pub(crate) calls: AtomicUsize,
    }

    impl SlowRateSource {
        pub(crate) fn new(replies: Vec<Result<f64, EstimationError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn fixed(rate: f64) -> Self {
            Self::new(vec![Ok(rate)])
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RateSource for SlowRateSource {
        async fn fetch_rate(
            &self,
            base: &str,
            target: &str,
        ) -> Result<ExchangeRate, EstimationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            let reply = {
                let mut replies = self.replies.lock().expect("replies");
                if replies.len() > 1 {
                    replies.remove(0)
                } else {
                    replies[0].clone()
                }
            };
            ExchangeRate::new(base, target, reply?)
        }
    }

    pub(crate) fn eur_usd() -> CurrencyConfig {
        CurrencyConfig {
            base: "EUR".to_string(),
            target: "USD".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::{eur_usd, SlowRateSource};
    use super::*;

    #[test]
    fn round_trip_returns_the_original_amount() {
        let rate = ExchangeRate::new("EUR", "USD", 1.08).unwrap();
        for amount in [1.0, 4850.0, 485_000.0, 1_234_567.89] {
            let there = rate.convert(amount, ConversionDirection::BaseToTarget);
            let back = rate.convert(there, ConversionDirection::TargetToBase);
            assert!((back - amount).abs() < 1e-6 * amount, "{amount} -> {back}");
        }
        assert!((rate.convert(485_000.0, ConversionDirection::BaseToTarget) - 523_800.0).abs() < 1e-6);
    }

    #[test]
    fn zero_and_negative_rates_are_rejected() {
        assert!(ExchangeRate::new("EUR", "USD", 0.0).is_err());
        assert!(ExchangeRate::new("EUR", "USD", -1.2).is_err());
        assert!(ExchangeRate::new("EUR", "USD", f64::NAN).is_err());
    }

    #[test]
    fn pending_is_distinct_from_zero() {
        let converter = CurrencyConverter::new(Arc::new(SlowRateSource::fixed(1.08)), &eur_usd());
        assert_eq!(converter.rate_status(), RateStatus::Loading);
        let pending = converter.convert(0.0, ConversionDirection::BaseToTarget);
        assert_eq!(pending, Conversion::Pending);
        assert_ne!(pending, Conversion::Amount(0.0));
        assert_eq!(pending.amount(), None);
        assert_eq!(pending.display("USD"), "pending");
    }

    #[tokio::test]
    async fn concurrent_consumers_share_one_fetch() {
        let source = Arc::new(SlowRateSource::fixed(1.08));
        let converter = CurrencyConverter::new(source.clone(), &eur_usd());

        let (a, b, c) = tokio::join!(
            converter.ensure_rate(),
            converter.ensure_rate(),
            converter.ensure_rate()
        );
        assert_eq!(a.unwrap().rate(), 1.08);
        assert_eq!(b.unwrap(), c.unwrap());
        assert_eq!(source.call_count(), 1);

        converter.ensure_rate().await.unwrap();
        assert_eq!(source.call_count(), 1);
        assert_eq!(
            converter.convert(485_000.0, ConversionDirection::BaseToTarget),
            Conversion::Amount(485_000.0 * 1.08)
        );
    }

    #[tokio::test]
    async fn failure_sticks_until_retry() {
        let source = Arc::new(SlowRateSource::new(vec![
            Err(EstimationError::Network("HTTP 503".into())),
            Ok(1.1),
        ]));
        let converter = CurrencyConverter::new(source.clone(), &eur_usd());

        assert!(converter.ensure_rate().await.is_err());
        assert!(matches!(converter.rate_status(), RateStatus::Failed(_)));
        assert!(converter.ensure_rate().await.is_err());
        assert_eq!(source.call_count(), 1);
        assert_eq!(
            converter.convert(10.0, ConversionDirection::BaseToTarget),
            Conversion::Pending
        );

        assert!(converter.retry());
        assert_eq!(converter.rate_status(), RateStatus::Loading);
        assert_eq!(converter.ensure_rate().await.unwrap().rate(), 1.1);
        assert_eq!(source.call_count(), 2);
        assert!(!converter.retry(), "a ready rate is never replaced");
    }

    #[test]
    fn amounts_group_by_thousands() {
        assert_eq!(format_amount(485_000.0, "EUR"), "485 000 EUR");
        assert_eq!(format_amount(523_800.4, "USD"), "523 800 USD");
        assert_eq!(format_amount(4850.0, "EUR"), "4 850 EUR");
        assert_eq!(format_amount(999.6, "EUR"), "1 000 EUR");
        assert_eq!(format_amount(12.0, "EUR"), "12 EUR");
        assert_eq!(format_amount(-1_500_000.0, "EUR"), "-1 500 000 EUR");
    }
}
