use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};

use crate::types::{FunctionDefinition, Tool};

/// 参数的基本类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    /// `YYYY-MM-DD` 格式的字符串
    Date,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Date => "date",
        }
    }

    fn json_schema(&self, description: &str) -> Value {
        match self {
            ParamType::Date => json!({
                "type": "string",
                "format": "date",
                "description": description,
            }),
            other => json!({
                "type": other.as_str(),
                "description": description,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamType,
    pub required: bool,
    pub description: &'static str,
}

const fn required(name: &'static str, kind: ParamType, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: true,
        description,
    }
}

/// 函数描述：名称、说明、参数结构
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
}

impl FunctionDescriptor {
    /// 转换为 JSON Schema 形式的参数说明
    pub fn parameter_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(param.name.to_string(), param.kind.json_schema(param.description));
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn to_tool(&self) -> Tool {
        Tool::function(FunctionDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: self.parameter_schema(),
        })
    }
}

/// 可供模型调用的函数集合，进程内固定不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    Weather,
    Hotels,
    Flights,
}

impl FunctionKind {
    pub const ALL: [FunctionKind; 3] = [FunctionKind::Weather, FunctionKind::Hotels, FunctionKind::Flights];

    pub fn name(&self) -> &'static str {
        match self {
            FunctionKind::Weather => "getWeather",
            FunctionKind::Hotels => "getHotels",
            FunctionKind::Flights => "getFlights",
        }
    }

    pub fn descriptor(&self) -> &'static FunctionDescriptor {
        match self {
            FunctionKind::Weather => &DESCRIPTORS[0],
            FunctionKind::Hotels => &DESCRIPTORS[1],
            FunctionKind::Flights => &DESCRIPTORS[2],
        }
    }

    fn build_descriptor(self) -> FunctionDescriptor {
        let (description, params) = match self {
            FunctionKind::Weather => (
                "Get the current weather for a city or destination",
                vec![required("location", ParamType::String, "City or destination")],
            ),
            FunctionKind::Hotels => (
                "Get up to three hotel options in a city for a stay between two dates",
                vec![
                    required("location", ParamType::String, "City or destination"),
                    required("fromDate", ParamType::Date, "Check-in date in YYYY-MM-DD format"),
                    required("toDate", ParamType::Date, "Check-out date in YYYY-MM-DD format"),
                    required("travellers", ParamType::Integer, "Number of adult travellers"),
                ],
            ),
            FunctionKind::Flights => (
                "Get the best one-way flight between two cities on a travel date",
                vec![
                    required("fromCity", ParamType::String, "Departure city name"),
                    required("toCity", ParamType::String, "Destination city name"),
                    required("date", ParamType::Date, "Travel date in YYYY-MM-DD format"),
                ],
            ),
        };

        FunctionDescriptor {
            name: self.name(),
            description,
            params,
        }
    }
}

/// 按 FunctionKind::ALL 顺序构建（懒加载，只初始化一次）
static DESCRIPTORS: Lazy<Vec<FunctionDescriptor>> =
    Lazy::new(|| FunctionKind::ALL.iter().map(|k| k.build_descriptor()).collect());

static TOOLS: Lazy<Vec<Tool>> = Lazy::new(|| DESCRIPTORS.iter().map(FunctionDescriptor::to_tool).collect());

/// 按名称查找函数
pub fn lookup(name: &str) -> Option<FunctionKind> {
    FunctionKind::ALL.into_iter().find(|kind| kind.name() == name)
}

/// 提供给推理服务的工具列表
pub fn get_tools_static() -> &'static [Tool] {
    &TOOLS
}
