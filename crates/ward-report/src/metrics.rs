//! Page performance metrics, filled opportunistically

use serde::{Deserialize, Serialize};
use ward_browser::Page;
use ward_core::Result;

const PERFORMANCE_SCRIPT: &str = r#"(() => {
  const navigation = performance.getEntriesByType('navigation')[0];
  const resources = performance.getEntriesByType('resource');
  return {
    pageLoadTime: navigation ? navigation.loadEventEnd - navigation.fetchStart : 0,
    responseTime: navigation ? navigation.responseEnd - navigation.requestStart : 0,
    resourceCount: resources.length,
    networkFailures: resources.filter(r => r.transferSize === 0).length,
    memoryUsage: performance.memory ? performance.memory.usedJSHeapSize : null
  };
})()"#;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_load_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_failures: Option<u64>,
}

impl TestMetrics {
    /// Overwrite fields that `other` has values for
    pub fn merge(&mut self, other: TestMetrics) {
        self.response_time = other.response_time.or(self.response_time);
        self.page_load_time = other.page_load_time.or(self.page_load_time);
        self.resource_count = other.resource_count.or(self.resource_count);
        self.memory_usage = other.memory_usage.or(self.memory_usage);
        self.network_failures = other.network_failures.or(self.network_failures);
    }

    /// `(label, value)` pairs for the fields that are set
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(v) = self.response_time {
            out.push(("Response Time", format!("{:.0}ms", v)));
        }
        if let Some(v) = self.page_load_time {
            out.push(("Page Load Time", format!("{:.0}ms", v)));
        }
        if let Some(v) = self.resource_count {
            out.push(("Resource Count", v.to_string()));
        }
        if let Some(v) = self.memory_usage {
            out.push(("Memory Usage", format!("{} bytes", v)));
        }
        if let Some(v) = self.network_failures {
            out.push(("Network Failures", v.to_string()));
        }
        out
    }
}

/// Read navigation timing and heap usage from the browser
pub async fn collect_metrics(page: &dyn Page) -> Result<TestMetrics> {
    let value = page.evaluate(PERFORMANCE_SCRIPT).await?;
    if value.is_null() {
        return Ok(TestMetrics::default());
    }
    Ok(serde_json::from_value(value)?)
}
