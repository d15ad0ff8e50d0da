//! Static HTML renderings of the detailed report and the run summary

use std::fmt::Write;

use crate::detailed::DetailedReport;
use crate::summary::RunSummary;

/// Escape text for inclusion in HTML content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const DETAILED_STYLE: &str = r#"
        body { font-family: Arial, sans-serif; margin: 20px; line-height: 1.6; }
        .header { background: #f4f4f4; padding: 20px; border-radius: 5px; margin-bottom: 20px; }
        .section { margin-bottom: 30px; }
        .step { border: 1px solid #ddd; padding: 15px; margin: 10px 0; border-radius: 5px; }
        .step.passed { border-left: 5px solid #4CAF50; }
        .step.failed { border-left: 5px solid #F44336; }
        .step.skipped { border-left: 5px solid #FF9800; }
        .step.open { border-left: 5px solid #9E9E9E; }
        .metrics { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 15px; }
        .metric-card { background: #f9f9f9; padding: 15px; border-radius: 5px; text-align: center; }
        .error { background: #ffebee; color: #c62828; padding: 10px; border-radius: 5px; }
        .screenshot { max-width: 100%; height: auto; border: 1px solid #ddd; border-radius: 5px; }"#;

pub fn render_detailed_html(report: &DetailedReport) -> String {
    let info = &report.test_info;
    let status = info
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let mut html = String::new();
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Test Report - {title}</title>
    <style>{style}
    </style>
</head>
<body>
    <div class="header">
        <h1>Test Report</h1>
        <h2>{title}</h2>
        <p><strong>Status:</strong> {status}</p>
        <p><strong>Duration:</strong> {duration}ms</p>
        <p><strong>Project:</strong> {project}</p>
        <p><strong>URL:</strong> {url}</p>
    </div>
"#,
        title = escape_html(&info.title),
        style = DETAILED_STYLE,
        status = escape_html(&status),
        duration = info.duration,
        project = escape_html(&info.project),
        url = escape_html(&report.execution.url),
    );

    html.push_str("    <div class=\"section\">\n        <h3>Performance Metrics</h3>\n        <div class=\"metrics\">\n");
    for (label, value) in report.metrics.entries() {
        let _ = writeln!(
            html,
            "            <div class=\"metric-card\"><h4>{}</h4><p>{}</p></div>",
            label.to_uppercase(),
            escape_html(&value)
        );
    }
    html.push_str("        </div>\n    </div>\n");

    html.push_str("    <div class=\"section\">\n        <h3>Test Steps</h3>\n");
    for step in &report.steps {
        let class = if step.is_open() {
            "open".to_string()
        } else {
            step.status.to_string()
        };
        let _ = writeln!(
            html,
            "        <div class=\"step {}\">\n            <h4>{}</h4>\n            <p><strong>Status:</strong> {}</p>\n            <p><strong>Duration:</strong> {}ms</p>",
            class,
            escape_html(&step.name),
            class,
            step.duration.unwrap_or(0)
        );
        if let Some(error) = &step.error {
            let _ = writeln!(html, "            <div class=\"error\">Error: {}</div>", escape_html(error));
        }
        if let Some(screenshot) = &step.screenshot {
            let _ = writeln!(
                html,
                "            <img src=\"{}\" alt=\"Screenshot\" class=\"screenshot\">",
                escape_html(screenshot)
            );
        }
        html.push_str("        </div>\n");
    }
    html.push_str("    </div>\n");

    if !report.errors.is_empty() {
        html.push_str("    <div class=\"section\">\n        <h3>Errors</h3>\n");
        for error in &report.errors {
            let _ = writeln!(html, "        <div class=\"error\">{}</div>", escape_html(error));
        }
        html.push_str("    </div>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

const SUMMARY_STYLE: &str = r#"
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; line-height: 1.6; color: #333; background: #f5f5f5; }
        .container { max-width: 1200px; margin: 0 auto; padding: 20px; }
        .header { background: white; padding: 30px; border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); margin-bottom: 30px; text-align: center; }
        .stats { display: grid; grid-template-columns: repeat(auto-fit, minmax(200px, 1fr)); gap: 20px; margin-bottom: 30px; }
        .stat-card { background: white; padding: 25px; border-radius: 10px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); text-align: center; }
        .stat-number { font-size: 2.5em; font-weight: bold; margin-bottom: 10px; }
        .passed { color: #4CAF50; }
        .failed { color: #F44336; }
        .skipped { color: #FF9800; }
        .total { color: #2196F3; }
        .results-table { background: white; border-radius: 10px; overflow: hidden; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
        table { width: 100%; border-collapse: collapse; }
        th, td { padding: 15px; text-align: left; border-bottom: 1px solid #ddd; }
        th { background: #f8f9fa; font-weight: 600; }
        .status-badge { padding: 5px 10px; border-radius: 15px; color: white; font-size: 0.9em; }
        .status-passed { background: #4CAF50; }
        .status-failed { background: #F44336; }
        .status-skipped { background: #FF9800; }
        .status-timedOut { background: #9C27B0; }
        .duration { color: #666; }
        .screenshot-link { display: inline-block; margin: 2px; padding: 2px 8px; background: #e3f2fd; color: #1976d2; text-decoration: none; border-radius: 3px; font-size: 0.8em; }
        .error { background: #ffebee; color: #c62828; padding: 10px; border-radius: 5px; font-size: 0.9em; max-width: 300px; word-break: break-word; }"#;

pub fn render_summary_html(summary: &RunSummary) -> String {
    let stats = &summary.stats;
    let mut html = String::new();
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Test Summary Report</title>
    <style>{style}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>🧪 Test Summary Report</h1>
            <p>Generated on {timestamp}</p>
            <p>Total Duration: {seconds}s</p>
        </div>
        <div class="stats">
            <div class="stat-card"><div class="stat-number total">{total}</div><div>Total Tests</div></div>
            <div class="stat-card"><div class="stat-number passed">{passed}</div><div>Passed</div></div>
            <div class="stat-card"><div class="stat-number failed">{failed}</div><div>Failed</div></div>
            <div class="stat-card"><div class="stat-number skipped">{skipped}</div><div>Skipped</div></div>
        </div>
        <div class="results-table">
            <table>
                <thead>
                    <tr><th>Test</th><th>Status</th><th>Duration</th><th>Project</th><th>Screenshots</th><th>Error</th></tr>
                </thead>
                <tbody>
"#,
        style = SUMMARY_STYLE,
        timestamp = summary.timestamp.to_rfc3339(),
        seconds = (summary.total_duration as f64 / 1000.0).round(),
        total = stats.total,
        passed = stats.passed,
        failed = stats.failed,
        skipped = stats.skipped,
    );

    for result in &summary.results {
        let links: String = result
            .screenshots
            .iter()
            .enumerate()
            .map(|(i, s)| {
                format!(
                    "<a href=\"{}\" class=\"screenshot-link\" target=\"_blank\">Screenshot {}</a>",
                    escape_html(s),
                    i + 1
                )
            })
            .collect();
        let error = result
            .error
            .as_deref()
            .map(|e| format!("<div class=\"error\">{}</div>", escape_html(e)))
            .unwrap_or_default();

        let _ = writeln!(
            html,
            "                    <tr><td><strong>{}</strong></td><td><span class=\"status-badge status-{}\">{}</span></td><td class=\"duration\">{}ms</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&result.title),
            result.status,
            result.status.to_string().to_uppercase(),
            result.duration,
            escape_html(&result.project),
            links,
            error
        );
    }

    html.push_str("                </tbody>\n            </table>\n        </div>\n    </div>\n</body>\n</html>\n");
    html
}
