//! Vega-Lite bar charts rendered to standalone HTML pages.

use anyhow::Context;
use capsule_cube::Frame;
use serde_json::{Value, json};

/// Vega-Lite measurement type of an encoding channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Nominal,
    Ordinal,
    Quantitative,
    Temporal,
}

impl FieldType {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Nominal => "nominal",
            Self::Ordinal => "ordinal",
            Self::Quantitative => "quantitative",
            Self::Temporal => "temporal",
        }
    }
}

/// A column bound to a channel, written as `field:T` shorthand
/// (`N`ominal, `O`rdinal, `Q`uantitative, `T`emporal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    pub field: String,
    pub field_type: FieldType,
}

impl Encoding {
    pub fn parse(shorthand: &str) -> anyhow::Result<Self> {
        let (field, code) = shorthand
            .rsplit_once(':')
            .with_context(|| format!("encoding '{shorthand}' must look like 'field:T'"))?;
        let field_type = match code {
            "N" => FieldType::Nominal,
            "O" => FieldType::Ordinal,
            "Q" => FieldType::Quantitative,
            "T" => FieldType::Temporal,
            other => anyhow::bail!("unknown encoding type '{other}' in '{shorthand}'"),
        };
        anyhow::ensure!(!field.is_empty(), "encoding '{shorthand}' has no field name");
        Ok(Self {
            field: field.to_string(),
            field_type,
        })
    }

    fn to_spec(&self) -> Value {
        json!({"field": self.field, "type": self.field_type.as_str()})
    }
}

#[derive(Debug, Clone)]
pub struct BarChart {
    pub title: String,
    pub x: Encoding,
    pub y: Encoding,
    pub color: Option<Encoding>,
}

impl BarChart {
    /// Vega-Lite spec with `frame` inlined as data values.
    ///
    /// The x axis keeps the frame's row order rather than sorting
    /// categories alphabetically.
    pub fn spec(&self, frame: &Frame) -> anyhow::Result<Value> {
        for encoding in [Some(&self.x), Some(&self.y), self.color.as_ref()]
            .into_iter()
            .flatten()
        {
            anyhow::ensure!(
                frame.columns.contains(&encoding.field),
                "chart field '{}' is not a column of the data ({:?})",
                encoding.field,
                frame.columns
            );
        }

        let mut x = self.x.to_spec();
        x["sort"] = Value::Null;
        let mut encoding = json!({"x": x, "y": self.y.to_spec()});
        if let Some(color) = &self.color {
            encoding["color"] = color.to_spec();
        }

        Ok(json!({
            "$schema": "https://vega.github.io/schema/vega-lite/v5.json",
            "title": self.title,
            "data": {"values": frame.to_records()},
            "mark": {"type": "bar"},
            "encoding": encoding,
        }))
    }

    /// Standalone HTML page embedding the chart.
    pub fn to_html(&self, frame: &Frame) -> anyhow::Result<String> {
        let spec = serde_json::to_string(&self.spec(frame)?)?;
        Ok(HTML_TEMPLATE
            .replace("{title}", &escape_html(&self.title))
            .replace("{spec}", &spec.replace("</", "<\\/")))
    }
}

const HTML_TEMPLATE: &str = r##"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <script src="https://cdn.jsdelivr.net/npm/vega@5"></script>
  <script src="https://cdn.jsdelivr.net/npm/vega-lite@5"></script>
  <script src="https://cdn.jsdelivr.net/npm/vega-embed@6"></script>
</head>
<body>
  <div id="vis"></div>
  <script type="text/javascript">
    vegaEmbed("#vis", {spec}).catch(console.error);
  </script>
</body>
</html>
"##;

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
