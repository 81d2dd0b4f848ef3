//! The `divination_liu_yao` tool: a six-line (六爻) chart from a moment and coin tosses.

use serde::Deserialize;
use sixline::DivinationChart;

use crate::schema::SchemaNode;

use super::descriptor::{ToolDescriptor, ToolError};

pub const TOOL_NAME: &str = "divination_liu_yao";

const SUMMARY: &str = "六爻排盘工具 - 根据年月日时进行六爻占卜排盘，返回六爻盘面的详细信息。";

#[derive(Debug, Deserialize)]
struct DivinationInput {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
    #[serde(default)]
    yaogua: Option<Vec<u8>>,
}

pub fn input_schema() -> SchemaNode {
    SchemaNode::object()
        .title("DivinationInput")
        .describe("六爻排盘的输入参数，公历的年月日时24时制数字数字")
        .field(
            "year",
            SchemaNode::integer()
                .range(1900, 2100)
                .describe("年份，例如 2024"),
        )
        .field(
            "month",
            SchemaNode::integer().range(1, 12).describe("月份，1-12 的整数"),
        )
        .field(
            "day",
            SchemaNode::integer()
                .range(1, 31)
                .describe("日期，1-31 的整数，需符合实际月份天数"),
        )
        .field(
            "hour",
            SchemaNode::integer()
                .range(0, 23)
                .describe("小时，0-23 的整数，使用24小时制"),
        )
        .optional_field(
            "yaogua",
            SchemaNode::array(SchemaNode::integer().range(0, 3))
                .length(sixline::LINE_COUNT, sixline::LINE_COUNT)
                .nullable()
                .describe(
                    "摇卦结果数组，从初爻到上爻排列, 数字代表硬币背面的个数，范围从0-3。如果不提供，就自动摇卦",
                ),
            Some(serde_json::Value::Null),
        )
}

/// Human-readable summary followed by the JSON Schema of the result.
pub fn description() -> String {
    let output_schema = schemars::schema_for!(DivinationChart);
    let rendered = serde_json::to_string(&output_schema).unwrap_or_default();
    format!("{SUMMARY}返回结果遵循以下JSON Schema定义:\n{rendered}")
}

fn execute(input: DivinationInput) -> Result<DivinationChart, ToolError> {
    let moment = sixline::moment_from_parts(input.year, input.month, input.day, input.hour)
        .map_err(ToolError::new)?;
    let yaogua = match input.yaogua {
        Some(lines) => lines,
        None => {
            let tossed = sixline::toss_coins().to_vec();
            tracing::debug!(?tossed, "No yaogua given, tossed coins");
            tossed
        }
    };
    sixline::compute(moment, &yaogua).map_err(ToolError::new)
}

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::typed(TOOL_NAME, description(), input_schema(), execute)
}
