// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Plain-text maintenance report

use super::DecisionEngineResult;

const RULE_WIDTH: usize = 47;

/// Render `result` as a fixed-layout, human-readable report
pub fn generate_report(result: &DecisionEngineResult, anomaly_threshold: f64) -> String {
    let heavy = "═".repeat(RULE_WIDTH);
    let mut lines: Vec<String> = Vec::new();

    lines.push(heavy.clone());
    lines.push("     MACHINE HEALTH & MAINTENANCE REPORT      ".to_string());
    lines.push(heavy.clone());
    lines.push(String::new());
    lines.push(format!("Machine ID: {}", result.machine_id));
    lines.push(format!("Timestamp: {}", result.timestamp.format("%Y-%m-%d %H:%M:%S UTC")));
    lines.push(format!("Alert Level: {}", result.alert_level.as_str().to_uppercase()));
    lines.push(String::new());

    lines.push("─── HEALTH METRICS ───".to_string());
    lines.push(format!("Overall Health: {}/100", result.health_score));
    lines.push(format!("Risk Score: {}/100", result.risk_score));
    lines.push(format!("Performance: {}/100", result.performance_score));
    lines.push(format!("Efficiency: {}/100", result.efficiency_score));
    lines.push(String::new());

    if let Some(issue) = &result.primary_issue {
        lines.push("─── PRIMARY ISSUE ───".to_string());
        lines.push(format!("⚠ {}", issue));
        lines.push(String::new());
    }

    lines.push("─── ML ANALYSIS RESULTS ───".to_string());
    let anomaly = &result.anomaly_detection;
    lines.push(format!(
        "Anomaly: {}",
        if anomaly.is_anomaly { "DETECTED" } else { "None" }
    ));
    lines.push(format!("  Error: {:.4}", anomaly.reconstruction_error));
    lines.push(format!("  Threshold: {}", anomaly_threshold));
    lines.push(String::new());
    lines.push(format!("Load Forecast: {:.2} kW", result.load_forecast.predicted_load));
    lines.push(format!(
        "Optimization: {}",
        result.load_optimization.action.as_str().to_uppercase()
    ));
    lines.push(format!("  Confidence: {:.1}%", result.load_optimization.confidence * 100.0));
    lines.push(String::new());

    if let Some(hours) = result.estimated_time_to_failure {
        lines.push("─── PREDICTIVE MAINTENANCE ───".to_string());
        lines.push(format!("Estimated Time to Failure: {:.1} hours", hours));
        lines.push(format!("Confidence: {:.1}%", result.maintenance_confidence * 100.0));
        lines.push(String::new());
    }

    lines.push("─── RECOMMENDED ACTION ───".to_string());
    lines.push(format!(
        "Action: {}",
        result.recommended_action.as_str().replace('_', " ").to_uppercase()
    ));
    lines.push(format!("Priority: {}", stars(result.action_priority)));
    lines.push(format!("Reason: {}", result.action_reason));
    lines.push(String::new());
    lines.push("Details:".to_string());
    for detail in &result.action_details {
        lines.push(format!("  • {}", detail));
    }
    lines.push(String::new());
    lines.push(heavy);

    lines.join("\n")
}

/// Five-slot star rating
fn stars(priority: u8) -> String {
    let filled = usize::from(priority.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}
