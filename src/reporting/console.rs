//! # Console Reporting Module / 控制台报告模块
//!
//! This module prints grading results to the console: a per-case table, a
//! totals panel, and the failure details of every case that did not pass.
//! All text is localized and color coded.
//!
//! 此模块在控制台打印评测结果：逐用例表格、总分面板，以及每个未通过用例的失败详情。
//! 所有文本均已本地化并带有颜色标记。

use colored::*;

use crate::core::config::TestCase;
use crate::core::models::{ErrorDetail, Status, TestResult, percentage};
use crate::infra::t;

const MESSAGE_WIDTH: usize = 48;
const OUTPUT_PREVIEW_LINES: usize = 20;

/// Prints a formatted table of case results.
///
/// 打印格式化的用例结果表格。
///
/// # Output Format / 输出格式
/// ```text
/// Test Case          | Result  |    Time |      Score | Message
/// Hello world        | PASS    |   0.02s |  10.0/10.0 | All steps completed
/// Dynamic linking    | FAIL    |   5.01s |   5.0/10.0 | Step 2 'run' timed out after 5s
/// ```
pub fn print_results_table(cases: &[TestCase], results: &[TestResult]) {
    let name_header = t!("report.col_case");
    let name_width = cases
        .iter()
        .map(|c| c.meta.name.chars().count())
        .chain(std::iter::once(name_header.chars().count()))
        .max()
        .unwrap_or(10);

    let header = format!(
        "{:<name_width$} | {:<7} | {:>8} | {:>11} | {}",
        name_header,
        t!("report.col_result"),
        t!("report.col_time"),
        t!("report.col_score"),
        t!("report.col_message"),
    );
    let rule = "-".repeat(header.chars().count().max(name_width + 40));

    println!();
    println!("{}", rule);
    println!("{}", header.bold());
    println!("{}", rule);

    for (case, result) in cases.iter().zip(results) {
        let status = result.status();
        let status_str = format!("{:<7}", status.as_str());
        let status_colored = match status {
            Status::Pass => status_str.green(),
            Status::Partial => status_str.yellow(),
            Status::Fail => status_str.red(),
        };
        println!(
            "{:<name_width$} | {} | {:>8} | {:>11} | {}",
            case.meta.name.cyan(),
            status_colored,
            format!("{:.2}s", result.time),
            format!("{:.1}/{:.1}", result.score, result.max_score),
            truncate(&result.message, MESSAGE_WIDTH),
        );
    }
    println!("{}", rule);
}

/// Prints the aggregate score panel.
///
/// 打印总分面板。绿色表示满分，黄色表示未满分。
pub fn print_totals(total_score: f64, max_score: f64) {
    let line = t!(
        "report.total_score",
        score = format!("{:.1}", total_score),
        max = format!("{:.1}", max_score),
        percentage = format!("{:.1}", percentage(total_score, max_score))
    )
    .to_string();
    let width = line.chars().count() + 2;
    let full_marks = max_score > 0.0 && (total_score - max_score).abs() < f64::EPSILON;
    let paint = |s: &str| if full_marks { s.green() } else { s.yellow() };

    println!();
    println!("{}", paint(&format!("┌{}┐", "─".repeat(width))));
    println!("{} {} {}", paint("│"), line.bold(), paint("│"));
    println!("{}", paint(&format!("└{}┘", "─".repeat(width))));
    println!();
}

/// Prints every recorded failure of the cases that did not fully pass.
///
/// 打印所有未完全通过用例的失败记录。
pub fn print_failure_details(cases: &[TestCase], results: &[TestResult]) {
    let failing: Vec<(&TestCase, &TestResult)> = cases
        .iter()
        .zip(results)
        .filter(|(_, r)| !r.error_details.is_empty())
        .collect();
    if failing.is_empty() {
        return;
    }

    println!("{}", t!("report.failure_banner").red().bold());
    println!("{}", "-".repeat(80));
    for (i, (case, result)) in failing.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}'",
            i + 1,
            failing.len(),
            t!("report.failure_header").red(),
            case.meta.name.cyan()
        );
        for detail in &result.error_details {
            print_error_detail(detail);
        }
        println!("{}", "-".repeat(80));
    }
}

fn print_error_detail(detail: &ErrorDetail) {
    println!(
        "  {} {} '{}' ({})",
        t!("report.step").bold(),
        detail.step,
        detail.step_name,
        detail.kind.to_string().yellow()
    );
    println!("    {} {}", t!("report.error").bold(), detail.error_message);
    println!("    {} {}", t!("report.command").bold(), detail.command);
    if let Some(code) = detail.return_code {
        println!("    {} {}", t!("report.return_code").bold(), code);
    }
    for (label, text) in [
        (t!("report.stdout"), &detail.stdout),
        (t!("report.stderr"), &detail.stderr),
        (t!("report.expected"), &detail.expected_output),
    ] {
        if let Some(text) = text {
            println!("    {}", label.bold());
            print_preview(text);
        }
    }
}

fn print_preview(text: &str) {
    let lines: Vec<&str> = text.lines().collect();
    for line in lines.iter().take(OUTPUT_PREVIEW_LINES) {
        println!("      {}", line.dimmed());
    }
    if lines.len() > OUTPUT_PREVIEW_LINES {
        println!(
            "      {}",
            t!("report.lines_omitted", count = lines.len() - OUTPUT_PREVIEW_LINES).dimmed()
        );
    }
}

/// Prints the command that points `TEST_BUILD` at a failed case's build
/// directory.
pub fn print_test_build_hint(export_line: &str) {
    println!("{}", t!("report.test_build_hint").yellow());
    println!("  {}", export_line.bold());
}

/// Prints how to use the generated IDE debug profiles.
///
/// 打印生成的 IDE 调试配置的使用说明。
pub fn print_debug_instructions(debugger_extension: &str, profiles: usize) {
    println!("\n{}", t!("debug.instructions_title").bold());
    println!("{}", t!("debug.generated_files"));
    println!("{}", t!("debug.how_to", extension = debugger_extension));
    if profiles > 1 {
        println!("\n{}", t!("debug.generated_count", count = profiles).yellow());
    }
}

fn truncate(text: &str, width: usize) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.chars().count() <= width {
        return first_line.to_string();
    }
    let mut cut: String = first_line.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
