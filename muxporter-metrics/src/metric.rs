/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Metric representation and text exposition.

mod metric_label;
mod metric_labeled_value;
mod metric_type;

pub use self::metric_label::MetricLabel;
pub use self::metric_labeled_value::MetricLabeledValue;
pub use self::metric_type::MetricType;

/** A metric that can consist of one or more measured values of the same type
with different labels under a single name with an optional description ("help").

The name is relative to the namespace of the collector that produced it. The
namespace is prepended when rendered via [Self::as_text].
 */
#[derive(Clone, Debug)]
pub struct Metric {
    metric_name: String,
    metric_help: Option<String>,
    metric_type: MetricType,
    metric_labeled_values: Vec<MetricLabeledValue>,
}

impl Metric {
    /// Create a new metric with a single labeled value.
    pub fn from_metric_labeled_value(
        metric_name: impl Into<String>,
        metric_labeled_value: MetricLabeledValue,
    ) -> Self {
        Self::from_metric_labeled_values(metric_name, vec![metric_labeled_value])
    }

    /// Create a new metric with multiple labeled values.
    pub fn from_metric_labeled_values(
        metric_name: impl Into<String>,
        metric_labeled_values: Vec<MetricLabeledValue>,
    ) -> Self {
        debug_assert!(!metric_labeled_values.is_empty());
        Self {
            metric_name: metric_name.into(),
            metric_help: None,
            metric_type: MetricType::default(),
            metric_labeled_values,
        }
    }

    /// Set the optional help (description) text of the metric.
    pub fn set_help(mut self, metric_help: impl Into<String>) -> Self {
        self.metric_help = Some(metric_help.into());
        self
    }

    /// Set the optional type of the metric.
    ///
    /// When no type is provided, this metrics becomes "untyped".
    pub fn set_type(mut self, metric_type: MetricType) -> Self {
        self.metric_type = metric_type;
        self
    }

    /// Name of the metric without namespace.
    pub fn get_metric_name(&self) -> &str {
        &self.metric_name
    }

    /// Append the values of `other` that shares the name of this metric.
    ///
    /// Help and type of `self` wins unless missing.
    pub(crate) fn merge(&mut self, other: Metric) {
        debug_assert_eq!(self.metric_name, other.metric_name);
        if self.metric_help.is_none() {
            self.metric_help = other.metric_help;
        }
        if self.metric_type == MetricType::Untyped {
            self.metric_type = other.metric_type;
        }
        self.metric_labeled_values
            .extend(other.metric_labeled_values);
    }

    /// Convert metric into `PrometheusText0.0.4` format.
    pub fn as_text(&self, namespace: &str) -> String {
        let metric_name = if namespace.is_empty() {
            self.metric_name.to_owned()
        } else {
            namespace.to_string() + "_" + &self.metric_name
        };
        let mut ret = String::new();
        if let Some(metric_help) = &self.metric_help {
            ret.push_str("# HELP ");
            ret.push_str(&metric_name);
            ret.push(' ');
            ret.push_str(&Self::escape_help(metric_help));
            ret.push('\n');
        }
        match &self.metric_type {
            MetricType::Untyped => {}
            metric_type => {
                ret.push_str("# TYPE ");
                ret.push_str(&metric_name);
                ret.push(' ');
                ret.push_str(metric_type.as_str());
                ret.push('\n');
            }
        }
        for metric_labeled_value in &self.metric_labeled_values {
            ret.push_str(&metric_name);
            let metric_labels = metric_labeled_value.get_metric_labels();
            if !metric_labels.is_empty() {
                ret.push('{');
                for (i, metric_label) in metric_labels.iter().enumerate() {
                    ret.push_str(metric_label.get_name());
                    ret.push_str("=\"");
                    ret.push_str(&Self::escape_label_value(metric_label.get_value()));
                    ret.push('\"');
                    if i + 1 < metric_labels.len() {
                        ret.push(',');
                    }
                }
                ret.push('}');
            }
            ret.push(' ');
            ret.push_str(&Self::format_value(
                metric_labeled_value.get_metric_value(),
            ));
            ret.push('\n');
        }
        ret
    }

    /// Label values may contain any UTF-8, but `\`, `"` and line feeds must be
    /// escaped.
    fn escape_label_value(value: &str) -> String {
        let mut ret = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '\\' => ret.push_str("\\\\"),
                '"' => ret.push_str("\\\""),
                '\n' => ret.push_str("\\n"),
                c => ret.push(c),
            }
        }
        ret
    }

    /// Help text only escapes `\` and line feeds.
    fn escape_help(value: &str) -> String {
        value.replace('\\', "\\\\").replace('\n', "\\n")
    }

    /// Go style float rendering with `+Inf`, `-Inf` and `NaN`.
    fn format_value(value: f64) -> String {
        if value.is_nan() {
            "NaN".to_string()
        } else if value.is_infinite() {
            if value.is_sign_positive() {
                "+Inf".to_string()
            } else {
                "-Inf".to_string()
            }
        } else {
            value.to_string()
        }
    }
}

/// Replace characters that are not allowed in metric or label names with `_`.
///
/// Valid names match `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn sanitize_name(name: &str) -> String {
    let mut ret = String::with_capacity(name.len() + 1);
    for (i, c) in name.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            ret.push('_');
        }
        if c.is_ascii_alphanumeric() || c == '_' {
            ret.push(c);
        } else {
            ret.push('_');
        }
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_help_type_and_labels() {
        let text = Metric::from_metric_labeled_values(
            "connections_current",
            vec![
                MetricLabeledValue::new(3.0).add_label("state", "active"),
                MetricLabeledValue::new(0.5).add_label("state", "reading"),
            ],
        )
        .set_type(MetricType::Gauge)
        .set_help("Number of connections.")
        .as_text("nginx");
        assert_eq!(
            text,
            "# HELP nginx_connections_current Number of connections.\n\
             # TYPE nginx_connections_current gauge\n\
             nginx_connections_current{state=\"active\"} 3\n\
             nginx_connections_current{state=\"reading\"} 0.5\n"
        );
    }

    #[test]
    fn untyped_without_labels() {
        let text = Metric::from_metric_labeled_value("up", MetricLabeledValue::new(1.0))
            .as_text("redis");
        assert_eq!(text, "redis_up 1\n");
    }

    #[test]
    fn escapes_label_values() {
        let text = Metric::from_metric_labeled_value(
            "container_info",
            MetricLabeledValue::new(1.0).add_label("name", "a\"b\\c\nd"),
        )
        .as_text("docker");
        assert_eq!(text, "docker_container_info{name=\"a\\\"b\\\\c\\nd\"} 1\n");
    }

    #[test]
    fn special_float_values() {
        assert_eq!(Metric::format_value(f64::NAN), "NaN");
        assert_eq!(Metric::format_value(f64::INFINITY), "+Inf");
        assert_eq!(Metric::format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(Metric::format_value(-2.25), "-2.25");
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_name("com.docker.compose"), "com_docker_compose");
        assert_eq!(sanitize_name("9lives"), "_9lives");
        assert_eq!(sanitize_name("ok_name1"), "ok_name1");
    }
}
