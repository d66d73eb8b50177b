/// Feature id reported when a visibility checkbox is clicked.
pub const VISIBILITY_CHANGE_FEATURE: &str = "visibility-change";

/// A single use of a tree feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureUsage {
  pub feature_id:         &'static str,
  /// Whether the usage came from a direct user interaction.
  pub report_interaction: bool,
}

impl FeatureUsage {
  pub fn interaction(feature_id: &'static str) -> Self {
    Self {
      feature_id,
      report_interaction: true,
    }
  }
}

/// Receives feature usage reports. Delivery is up to the implementor.
pub trait TelemetrySink: Send + Sync {
  fn on_feature_used(&self, usage: &FeatureUsage);
}

/// Drops every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
  fn on_feature_used(&self, _usage: &FeatureUsage) {}
}

impl<F> TelemetrySink for F
where
  F: Fn(&FeatureUsage) + Send + Sync,
{
  fn on_feature_used(&self, usage: &FeatureUsage) {
    self(usage)
  }
}
