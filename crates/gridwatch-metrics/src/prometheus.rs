//! Prometheus text exposition format.
//!
//! Renders the metric families gathered by one scrape into the text
//! format (version 0.0.4) for scraping by a Prometheus server or
//! compatible agent.

use std::fmt::Write;

use crate::sink::MetricFamily;

/// Content type of the rendered exposition.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render metric families into Prometheus text format.
///
/// Families are written in the order given, each preceded by its HELP and
/// TYPE lines. Families without samples are skipped.
pub fn render_prometheus(families: &[MetricFamily]) -> String {
    let mut out = String::new();

    for family in families {
        if family.samples.is_empty() {
            continue;
        }
        let _ = writeln!(out, "# HELP {} {}", family.name, escape_help(family.help));
        let _ = writeln!(out, "# TYPE {} {}", family.name, family.kind.as_str());

        for sample in &family.samples {
            out.push_str(&family.name);
            out.push_str(sample.suffix);
            if !sample.labels.is_empty() {
                out.push('{');
                for (i, (k, v)) in sample.labels.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{k}=\"{}\"", escape_label(v));
                }
                out.push('}');
            }
            out.push(' ');
            out.push_str(&format_value(sample.value));
            out.push('\n');
        }
    }

    out
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        v.to_string()
    }
}

fn escape_label(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for c in v.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::Desc;
    use crate::sink::{MetricSink, Sample};

    fn scrape() -> Vec<MetricFamily> {
        let sink = MetricSink::new();
        sink.emit(&Desc::gauge("nomad", "up", "Was the last query successful."), 1.0, &[]);
        sink.emit(
            &Desc::counter("nomad", "evals", "Evaluations by status.", &["status"]),
            3.0,
            &["complete"],
        );
        sink.finish()
    }

    #[test]
    fn render_empty() {
        assert_eq!(render_prometheus(&[]), "");
    }

    #[test]
    fn render_help_type_and_samples() {
        let output = render_prometheus(&scrape());

        assert!(output.contains("# HELP nomad_up Was the last query successful.\n"));
        assert!(output.contains("# TYPE nomad_up gauge\n"));
        assert!(output.contains("nomad_up 1\n"));
        assert!(output.contains("# TYPE nomad_evals counter\n"));
        assert!(output.contains("nomad_evals{status=\"complete\"} 3\n"));
    }

    #[test]
    fn families_render_in_order() {
        let output = render_prometheus(&scrape());
        let up = output.find("nomad_up").unwrap();
        let evals = output.find("nomad_evals").unwrap();
        assert!(up < evals);
    }

    #[test]
    fn summary_suffixes_and_special_values() {
        let desc = Desc::summary("nomad", "api_latency_seconds", "Latency.", &["method"]);
        let sink = MetricSink::new();
        sink.push(
            &desc,
            vec![
                Sample {
                    suffix: "",
                    labels: vec![
                        ("method".into(), "leader".into()),
                        ("quantile".into(), "0.5".into()),
                    ],
                    value: f64::NAN,
                },
                Sample {
                    suffix: "_count",
                    labels: vec![("method".into(), "leader".into())],
                    value: 0.0,
                },
            ],
        );
        let output = render_prometheus(&sink.finish());

        assert!(output.contains("# TYPE nomad_api_latency_seconds summary\n"));
        assert!(output.contains("nomad_api_latency_seconds{method=\"leader\",quantile=\"0.5\"} NaN\n"));
        assert!(output.contains("nomad_api_latency_seconds_count{method=\"leader\"} 0\n"));
        assert_eq!(format_value(f64::INFINITY), "+Inf");
    }

    #[test]
    fn label_values_are_escaped() {
        assert_eq!(escape_label("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }

    #[test]
    fn render_format_is_prometheus_compatible() {
        let output = render_prometheus(&scrape());

        // Every sample line is `name[{labels}] value`.
        for line in output.lines() {
            if line.starts_with('#') {
                continue;
            }
            let (_, value) = line.rsplit_once(' ').unwrap();
            assert!(value.parse::<f64>().is_ok(), "bad value in line: {line}");
        }
    }
}
