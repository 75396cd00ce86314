//! Purpose: Render rows as a self-contained D3 v7 HTML page.
//! Exports: `D3Output`.
//! Role: Buffering back end; shapes data per chart type (label/value for bar
//! and pie, x/y for scatter, value for histogram) before templating.
//! Invariants: Embedded JSON is script-safe; the title is HTML-escaped.

use std::io::Write;

use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::core::error::{Error, ErrorKind};
use crate::core::row::Row;
use crate::output::{
    Capabilities, Render, RenderOptions, escape_html, escape_json_for_script, write_io_error,
};

const SUPPORTED_CHART_TYPES: &[&str] = &["bar", "pie", "scatter", "histogram"];

const BASE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>__TITLE__</title>
    <script src="https://d3js.org/d3.v7.min.js"></script>
    <style>
        body { font-family: sans-serif; margin: 20px; }
        .chart-container { max-width: 900px; margin: 0 auto; }
        .axis-label { font-size: 12px; font-weight: bold; }
        .tooltip {
            position: absolute;
            text-align: center;
            padding: 6px;
            font: 12px sans-serif;
            background: white;
            border: 1px solid #ccc;
            border-radius: 4px;
            pointer-events: none;
            opacity: 0;
        }
    </style>
</head>
<body>
    <div class="chart-container">
        <h1>__TITLE__</h1>
        <div id="chart"></div>
    </div>
    <script>
        const data = __DATA__;
        const config = __CONFIG__;

        const margin = {top: 40, right: 40, bottom: 60, left: 60};
        const width = 800 - margin.left - margin.right;
        const height = 500 - margin.top - margin.bottom;

        const svg = d3.select("#chart")
            .append("svg")
            .attr("width", width + margin.left + margin.right)
            .attr("height", height + margin.top + margin.bottom)
            .append("g")
            .attr("transform", "translate(" + margin.left + "," + margin.top + ")");

        const tooltip = d3.select("body").append("div")
            .attr("class", "tooltip");

        const showTooltip = function(event, text) {
            tooltip.transition().duration(200).style("opacity", .9);
            tooltip.html(text)
                .style("left", (event.pageX + 10) + "px")
                .style("top", (event.pageY - 28) + "px");
        };
        const hideTooltip = function() {
            tooltip.transition().duration(500).style("opacity", 0);
        };

        const axisLabels = function(xScaleless) {
            if (config.xLabel) {
                svg.append("text")
                    .attr("class", "axis-label")
                    .attr("text-anchor", "middle")
                    .attr("x", width / 2)
                    .attr("y", height + margin.bottom - 5)
                    .text(config.xLabel);
            }
            if (config.yLabel) {
                svg.append("text")
                    .attr("class", "axis-label")
                    .attr("text-anchor", "middle")
                    .attr("transform", "rotate(-90)")
                    .attr("y", -margin.left + 20)
                    .attr("x", -height / 2)
                    .text(config.yLabel);
            }
        };

        __CHART_SCRIPT__
    </script>
</body>
</html>
"##;

const BAR_SCRIPT: &str = r#"
        const x = d3.scaleBand().range([0, width]).padding(0.1);
        const y = d3.scaleLinear().range([height, 0]);

        x.domain(data.map(d => d.label));
        y.domain([0, d3.max(data, d => d.value)]);

        svg.append("g")
            .attr("transform", "translate(0," + height + ")")
            .call(d3.axisBottom(x))
            .selectAll("text")
            .style("text-anchor", "end")
            .attr("dx", "-.8em")
            .attr("dy", ".15em")
            .attr("transform", "rotate(-45)");

        svg.append("g").call(d3.axisLeft(y));

        svg.selectAll(".bar")
            .data(data)
            .enter().append("rect")
            .attr("class", "bar")
            .attr("x", d => x(d.label))
            .attr("width", x.bandwidth())
            .attr("y", d => y(d.value))
            .attr("height", d => height - y(d.value))
            .attr("fill", config.color || "steelblue")
            .on("mouseover", (event, d) => showTooltip(event, d.label + ": " + d.value))
            .on("mouseout", hideTooltip);

        axisLabels();
"#;

const PIE_SCRIPT: &str = r#"
        const radius = Math.min(width, height) / 2;
        const pieSvg = svg.append("g")
            .attr("transform", "translate(" + width / 2 + "," + height / 2 + ")");

        const color = d3.scaleOrdinal(d3.schemeCategory10);
        const pie = d3.pie().value(d => d.value);
        const path = d3.arc().outerRadius(radius - 10).innerRadius(0);
        const label = d3.arc().outerRadius(radius - 40).innerRadius(radius - 40);

        const arc = pieSvg.selectAll(".arc")
            .data(pie(data))
            .enter().append("g")
            .attr("class", "arc");

        arc.append("path")
            .attr("d", path)
            .attr("fill", d => color(d.data.label))
            .on("mouseover", (event, d) => showTooltip(event,
                d.data.label + ": " + d.data.value + " (" +
                Math.round((d.endAngle - d.startAngle) / (2 * Math.PI) * 100) + "%)"))
            .on("mouseout", hideTooltip);

        arc.append("text")
            .attr("transform", d => "translate(" + label.centroid(d) + ")")
            .attr("dy", "0.35em")
            .text(d => d.data.label);
"#;

const SCATTER_SCRIPT: &str = r#"
        const x = d3.scaleLinear().range([0, width]);
        const y = d3.scaleLinear().range([height, 0]);

        x.domain(d3.extent(data, d => d.x)).nice();
        y.domain(d3.extent(data, d => d.y)).nice();

        svg.append("g")
            .attr("transform", "translate(0," + height + ")")
            .call(d3.axisBottom(x));

        svg.append("g").call(d3.axisLeft(y));

        svg.selectAll(".dot")
            .data(data)
            .enter().append("circle")
            .attr("class", "dot")
            .attr("r", 3.5)
            .attr("cx", d => x(d.x))
            .attr("cy", d => y(d.y))
            .style("fill", config.color || "steelblue")
            .on("mouseover", (event, d) => showTooltip(event, "(" + d.x + ", " + d.y + ")"))
            .on("mouseout", hideTooltip);

        axisLabels();
"#;

const HISTOGRAM_SCRIPT: &str = r#"
        const x = d3.scaleLinear()
            .domain(d3.extent(data, d => d.value))
            .range([0, width]);

        svg.append("g")
            .attr("transform", "translate(0," + height + ")")
            .call(d3.axisBottom(x));

        const histogram = d3.bin()
            .value(d => d.value)
            .domain(x.domain())
            .thresholds(x.ticks(20));

        const bins = histogram(data);

        const y = d3.scaleLinear().range([height, 0]);
        y.domain([0, d3.max(bins, d => d.length)]);

        svg.append("g").call(d3.axisLeft(y));

        svg.selectAll("rect")
            .data(bins)
            .enter().append("rect")
            .attr("x", 1)
            .attr("transform", d => "translate(" + x(d.x0) + "," + y(d.length) + ")")
            .attr("width", d => Math.max(0, x(d.x1) - x(d.x0) - 1))
            .attr("height", d => height - y(d.length))
            .style("fill", config.color || "steelblue")
            .on("mouseover", (event, d) => showTooltip(event,
                "Range: " + d.x0 + " - " + d.x1 + "<br>Count: " + d.length))
            .on("mouseout", hideTooltip);

        axisLabels();
"#;

pub struct D3Output;

impl Render for D3Output {
    fn name(&self) -> &'static str {
        "d3"
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
        let chart_type = options.chart_type.as_deref().unwrap_or("bar");
        let script = match chart_type {
            "bar" => BAR_SCRIPT,
            "pie" => PIE_SCRIPT,
            "scatter" => SCATTER_SCRIPT,
            "histogram" => HISTOGRAM_SCRIPT,
            other => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("unsupported chart type {other:?}"))
                    .with_hint(format!("d3 supports: {}.", SUPPORTED_CHART_TYPES.join(", "))));
            }
        };

        let mut data = Vec::new();
        while let Some(row) = rows.blocking_recv() {
            if let Some(datum) = shape_datum(chart_type, &row) {
                data.push(datum);
            }
        }

        let config = json!({
            "title": options.title,
            "chartType": chart_type,
            "xLabel": options.x_label,
            "yLabel": options.y_label,
            "color": options.color,
        });

        let data_json = serde_json::to_string(&data).map_err(serialize_error)?;
        let config_json = serde_json::to_string(&config).map_err(serialize_error)?;

        let page = BASE_TEMPLATE
            .replace("__TITLE__", &escape_html(&options.title))
            .replace("__DATA__", &escape_json_for_script(&data_json))
            .replace("__CONFIG__", &escape_json_for_script(&config_json))
            .replace("__CHART_SCRIPT__", script);
        out.write_all(page.as_bytes()).map_err(write_io_error)?;
        Ok(())
    }
}

fn serialize_error(err: serde_json::Error) -> Error {
    Error::new(ErrorKind::Internal)
        .with_message("failed to serialize chart data")
        .with_source(err)
}

/// Rows that don't carry the columns a chart type needs are skipped.
fn shape_datum(chart_type: &str, row: &Row) -> Option<Value> {
    match chart_type {
        "bar" | "pie" => {
            let label = row.texts.first().or_else(|| row.timestamps.first())?;
            let value = row.numbers.first()?;
            Some(json!({ "label": label, "value": value }))
        }
        "scatter" => {
            if row.numbers.len() < 2 {
                return None;
            }
            Some(json!({ "x": row.numbers[0], "y": row.numbers[1] }))
        }
        "histogram" => {
            let value = row.numbers.first()?;
            Some(json!({ "value": value }))
        }
        _ => None,
    }
}
