//! Purpose: Render rows as a self-contained Chart.js HTML page.
//! Exports: `ChartJsOutput`.
//! Role: Buffering back end; the whole stream is collected before the chart
//! config is built.
//! Invariants: Embedded JSON is script-safe; titles and labels are HTML-escaped.
//! Notes: When rows carry text but no numbers, the first text column is
//! frequency-counted and the default chart type becomes `bar`.

use std::io::Write;

use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::core::error::{Error, ErrorKind};
use crate::core::row::Row;
use crate::output::{
    Capabilities, Render, RenderOptions, escape_html, escape_json_for_script, write_io_error,
};

const SUPPORTED_CHART_TYPES: &[&str] = &["line", "bar", "pie", "scatter"];
const SUPPORTED_SCALES: &[&str] = &["linear", "logarithmic"];

const PALETTE: &[&str] = &[
    "#36a2eb", "#ff6384", "#ff9f40", "#ffcd56", "#4bc0c0", "#9966ff", "#c9cbcf",
];

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>__TITLE__</title>
    <script src="https://cdn.jsdelivr.net/npm/chart.js@4"></script>
    <style>
        body { font-family: sans-serif; margin: 20px; }
        .chart-container { max-width: 900px; margin: 0 auto; }
    </style>
</head>
<body>
    <div class="chart-container">
        <canvas id="chart"></canvas>
    </div>
    <script>
        const config = __CONFIG__;
        new Chart(document.getElementById("chart"), config);
    </script>
</body>
</html>
"#;

pub struct ChartJsOutput;

impl Render for ChartJsOutput {
    fn name(&self) -> &'static str {
        "chartjs"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            streaming: false,
            interactive: true,
        }
    }

    fn render(
        &self,
        mut rows: mpsc::Receiver<Row>,
        options: &RenderOptions,
        out: &mut dyn Write,
    ) -> Result<(), Error> {
        let mut buffered = Vec::new();
        while let Some(row) = rows.blocking_recv() {
            buffered.push(row);
        }

        let mut chart_type = match options.chart_type.as_deref() {
            Some(requested) => {
                if !SUPPORTED_CHART_TYPES.contains(&requested) {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message(format!("unsupported chart type {requested:?}"))
                        .with_hint(format!(
                            "chartjs supports: {}.",
                            SUPPORTED_CHART_TYPES.join(", ")
                        )));
                }
                requested.to_string()
            }
            None => "line".to_string(),
        };

        if !SUPPORTED_SCALES.contains(&options.scale.as_str()) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unsupported scale {:?}", options.scale))
                .with_hint(format!("chartjs supports: {}.", SUPPORTED_SCALES.join(", "))));
        }

        // Text-only streams become frequency counts of the first text column.
        let text_only = buffered
            .first()
            .is_some_and(|row| row.numbers.is_empty() && !row.texts.is_empty());
        if text_only {
            buffered = frequency_counts(&buffered);
            if options.chart_type.is_none() {
                chart_type = "bar".to_string();
            }
        }

        let config = chart_config(&chart_type, &buffered, options);
        let config_json = serde_json::to_string(&config).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to serialize chart config")
                .with_source(err)
        })?;

        let page = TEMPLATE
            .replace("__TITLE__", &escape_html(&options.title))
            .replace("__CONFIG__", &escape_json_for_script(&config_json));
        out.write_all(page.as_bytes()).map_err(write_io_error)?;
        Ok(())
    }
}

/// Counts first-text-column frequencies, descending, as label/value rows.
fn frequency_counts(rows: &[Row]) -> Vec<Row> {
    let mut counts: Vec<(String, f64)> = Vec::new();
    for row in rows {
        let Some(label) = row.texts.first() else {
            continue;
        };
        match counts.iter_mut().find(|(known, _)| known == label) {
            Some((_, count)) => *count += 1.0,
            None => counts.push((label.clone(), 1.0)),
        }
    }
    counts.sort_by(|a, b| b.1.total_cmp(&a.1));
    counts
        .into_iter()
        .map(|(label, count)| Row {
            numbers: vec![count],
            texts: vec![label],
            timestamps: vec![],
        })
        .collect()
}

fn chart_config(chart_type: &str, rows: &[Row], options: &RenderOptions) -> Value {
    let data = match chart_type {
        "scatter" => scatter_data(rows, options),
        _ => labelled_data(chart_type, rows, options),
    };

    let mut config = json!({
        "type": chart_type,
        "data": data,
        "options": {
            "plugins": {
                "title": {
                    "display": !options.title.is_empty(),
                    "text": options.title,
                }
            }
        }
    });

    // Pie charts have no cartesian axes to configure.
    if chart_type != "pie" {
        config["options"]["scales"] = json!({
            "x": {
                "title": { "display": !options.x_label.is_empty(), "text": options.x_label }
            },
            "y": {
                "type": options.scale,
                "beginAtZero": options.zero_based,
                "title": { "display": !options.y_label.is_empty(), "text": options.y_label }
            }
        });
    }
    config
}

/// Labels come from the first text column, then the first timestamp column,
/// then the 1-based row index; one dataset per number column.
fn labelled_data(chart_type: &str, rows: &[Row], options: &RenderOptions) -> Value {
    let labels: Vec<String> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.texts
                .first()
                .or_else(|| row.timestamps.first())
                .cloned()
                .unwrap_or_else(|| (i + 1).to_string())
        })
        .collect();

    let series = rows.iter().map(|row| row.numbers.len()).max().unwrap_or(0);
    let mut datasets = Vec::new();
    for column in 0..series {
        let values: Vec<Value> = rows
            .iter()
            .map(|row| row.numbers.get(column).map_or(Value::Null, |v| json!(v)))
            .collect();
        datasets.push(json!({
            "label": dataset_label(column, series, options),
            "data": values,
            "backgroundColor": dataset_colors(chart_type, column, &options.color, rows.len()),
            "borderColor": series_color(column, &options.color),
        }));
    }

    json!({ "labels": labels, "datasets": datasets })
}

fn scatter_data(rows: &[Row], options: &RenderOptions) -> Value {
    let points: Vec<Value> = rows
        .iter()
        .filter(|row| row.numbers.len() >= 2)
        .map(|row| json!({ "x": row.numbers[0], "y": row.numbers[1] }))
        .collect();
    json!({
        "datasets": [{
            "label": dataset_label(0, 1, options),
            "data": points,
            "backgroundColor": series_color(0, &options.color),
        }]
    })
}

fn dataset_label(column: usize, series: usize, options: &RenderOptions) -> String {
    if series == 1 && !options.y_label.is_empty() {
        options.y_label.clone()
    } else {
        format!("series {}", column + 1)
    }
}

fn series_color(column: usize, override_color: &str) -> String {
    if override_color.is_empty() {
        PALETTE[column % PALETTE.len()].to_string()
    } else {
        override_color.to_string()
    }
}

/// Pie slices get one color per data point; other charts one per series.
fn dataset_colors(chart_type: &str, column: usize, override_color: &str, len: usize) -> Value {
    if chart_type == "pie" && override_color.is_empty() {
        let colors: Vec<&str> = (0..len).map(|i| PALETTE[i % PALETTE.len()]).collect();
        json!(colors)
    } else {
        json!(series_color(column, override_color))
    }
}

#[cfg(test)]
mod tests {
    use super::{ChartJsOutput, frequency_counts};
    use crate::core::row::Row;
    use crate::output::{Render, RenderOptions};
    use tokio::sync::mpsc;

    fn rows_channel(rows: Vec<Row>) -> mpsc::Receiver<Row> {
        let (tx, rx) = mpsc::channel(rows.len().max(1));
        for row in rows {
            tx.try_send(row).unwrap();
        }
        rx
    }

    fn number_text_row(number: f64, text: &str) -> Row {
        Row {
            numbers: vec![number],
            texts: vec![text.to_string()],
            timestamps: vec![],
        }
    }

    #[test]
    fn renders_a_page_with_embedded_config() {
        let rows = vec![number_text_row(1.0, "a"), number_text_row(2.0, "b")];
        let options = RenderOptions {
            title: "My <Chart>".to_string(),
            scale: "linear".to_string(),
            ..RenderOptions::default()
        };
        let mut out = Vec::new();
        ChartJsOutput.render(rows_channel(rows), &options, &mut out).unwrap();

        let page = String::from_utf8(out).unwrap();
        assert!(page.contains("<title>My &lt;Chart&gt;</title>"));
        assert!(page.contains("new Chart"));
        assert!(page.contains(r#""type":"line""#));
        assert!(page.contains(r#""labels":["a","b"]"#));
    }

    #[test]
    fn rejects_unknown_chart_types_and_scales() {
        let options = RenderOptions {
            chart_type: Some("sparkline".to_string()),
            scale: "linear".to_string(),
            ..RenderOptions::default()
        };
        let mut out = Vec::new();
        assert!(
            ChartJsOutput
                .render(rows_channel(vec![]), &options, &mut out)
                .is_err()
        );

        let options = RenderOptions {
            scale: "cubic".to_string(),
            ..RenderOptions::default()
        };
        assert!(
            ChartJsOutput
                .render(rows_channel(vec![]), &options, &mut out)
                .is_err()
        );
    }

    #[test]
    fn text_only_streams_become_frequency_bars() {
        let text_row = |text: &str| Row {
            numbers: vec![],
            texts: vec![text.to_string()],
            timestamps: vec![],
        };
        let rows = vec![text_row("x"), text_row("y"), text_row("x")];
        let options = RenderOptions {
            scale: "linear".to_string(),
            ..RenderOptions::default()
        };
        let mut out = Vec::new();
        ChartJsOutput.render(rows_channel(rows), &options, &mut out).unwrap();

        let page = String::from_utf8(out).unwrap();
        assert!(page.contains(r#""type":"bar""#));
        assert!(page.contains(r#""labels":["x","y"]"#));
    }

    #[test]
    fn frequency_counts_sort_descending() {
        let text_row = |text: &str| Row {
            numbers: vec![],
            texts: vec![text.to_string()],
            timestamps: vec![],
        };
        let counted = frequency_counts(&[text_row("b"), text_row("a"), text_row("b")]);
        assert_eq!(counted[0].texts, vec!["b".to_string()]);
        assert_eq!(counted[0].numbers, vec![2.0]);
        assert_eq!(counted[1].texts, vec!["a".to_string()]);
    }

    #[test]
    fn scatter_uses_the_first_two_number_columns() {
        let rows = vec![Row {
            numbers: vec![1.0, 2.0],
            texts: vec![],
            timestamps: vec![],
        }];
        let options = RenderOptions {
            chart_type: Some("scatter".to_string()),
            scale: "linear".to_string(),
            ..RenderOptions::default()
        };
        let mut out = Vec::new();
        ChartJsOutput.render(rows_channel(rows), &options, &mut out).unwrap();
        let page = String::from_utf8(out).unwrap();
        assert!(page.contains(r#""x":1.0"#));
        assert!(page.contains(r#""y":2.0"#));
    }
}
