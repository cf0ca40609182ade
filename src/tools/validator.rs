//! 工具参数校验
//!
//! 模型给出的参数先解析成 JSON 对象，再按函数描述逐项检查，
//! 最后绑定为各查询函数使用的强类型参数。

use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::ValidationError;

use super::builtins::{FlightQuery, HotelQuery, WeatherQuery};
use super::registry::{FunctionDescriptor, FunctionKind, ParamType};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Num(f64),
    Bool(bool),
    Date(NaiveDate),
}

/// 通过结构检查的参数
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedArgs {
    function: &'static str,
    values: HashMap<&'static str, ArgValue>,
}

impl ValidatedArgs {
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    fn missing(&self, name: &str) -> ValidationError {
        argument_error(self.function, name, "missing required parameter")
    }

    fn string(&self, name: &str) -> Result<String, ValidationError> {
        match self.get(name) {
            Some(ArgValue::Str(s)) => Ok(s.clone()),
            _ => Err(self.missing(name)),
        }
    }

    fn date(&self, name: &str) -> Result<NaiveDate, ValidationError> {
        match self.get(name) {
            Some(ArgValue::Date(d)) => Ok(*d),
            _ => Err(self.missing(name)),
        }
    }

    fn integer(&self, name: &str) -> Result<i64, ValidationError> {
        match self.get(name) {
            Some(ArgValue::Int(n)) => Ok(*n),
            _ => Err(self.missing(name)),
        }
    }
}

/// 校验后的强类型调用参数
#[derive(Debug, Clone, PartialEq)]
pub enum CallArgs {
    Weather(WeatherQuery),
    Hotels(HotelQuery),
    Flights(FlightQuery),
}

impl CallArgs {
    pub fn kind(&self) -> FunctionKind {
        match self {
            CallArgs::Weather(_) => FunctionKind::Weather,
            CallArgs::Hotels(_) => FunctionKind::Hotels,
            CallArgs::Flights(_) => FunctionKind::Flights,
        }
    }
}

fn argument_error(function: &str, parameter: &str, detail: impl Into<String>) -> ValidationError {
    ValidationError::Argument {
        function: function.to_string(),
        parameter: parameter.to_string(),
        detail: detail.into(),
    }
}

/// 把原始参数解析为 JSON 对象：接受 JSON 字符串或对象
pub fn parse_arguments(function: &str, raw: &Value) -> Result<Map<String, Value>, ValidationError> {
    let parse_error = |detail: String| ValidationError::Parse {
        function: function.to_string(),
        detail,
    };

    let parsed = match raw {
        Value::Object(map) => return Ok(map.clone()),
        Value::String(text) if text.trim().is_empty() => return Ok(Map::new()),
        Value::String(text) => {
            serde_json::from_str::<Value>(text).map_err(|e| parse_error(e.to_string()))?
        }
        Value::Null => return Ok(Map::new()),
        other => return Err(parse_error(format!("expected a JSON object, got {}", other))),
    };

    match parsed {
        Value::Object(map) => Ok(map),
        other => Err(parse_error(format!("expected a JSON object, got {}", other))),
    }
}

fn check_value(
    function: &'static str,
    name: &'static str,
    kind: ParamType,
    value: &Value,
) -> Result<ArgValue, ValidationError> {
    let mismatch = || argument_error(function, name, format!("expected {}, got {}", kind.as_str(), value));

    match kind {
        ParamType::String => value.as_str().map(|s| ArgValue::Str(s.trim().to_string())).ok_or_else(mismatch),
        ParamType::Integer => value.as_i64().map(ArgValue::Int).ok_or_else(mismatch),
        ParamType::Number => value.as_f64().map(ArgValue::Num).ok_or_else(mismatch),
        ParamType::Boolean => value.as_bool().map(ArgValue::Bool).ok_or_else(mismatch),
        ParamType::Date => {
            let text = value.as_str().ok_or_else(mismatch)?;
            NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
                .map(ArgValue::Date)
                .map_err(|_| argument_error(function, name, format!("expected a date in YYYY-MM-DD format, got {}", value)))
        }
    }
}

/// 按描述检查参数：必填项必须存在，已给出的参数必须类型匹配。
/// 未声明的参数忽略。
pub fn check_schema(
    descriptor: &FunctionDescriptor,
    args: &Map<String, Value>,
) -> Result<ValidatedArgs, ValidationError> {
    let mut values = HashMap::new();

    for param in &descriptor.params {
        let value = match args.get(param.name) {
            None | Some(Value::Null) => {
                if param.required {
                    return Err(argument_error(descriptor.name, param.name, "missing required parameter"));
                }
                continue;
            }
            Some(value) => value,
        };

        let checked = check_value(descriptor.name, param.name, param.kind, value)?;
        if param.required && matches!(&checked, ArgValue::Str(s) if s.is_empty()) {
            return Err(argument_error(descriptor.name, param.name, "must not be empty"));
        }
        values.insert(param.name, checked);
    }

    Ok(ValidatedArgs {
        function: descriptor.name,
        values,
    })
}

/// 解析、检查并绑定为强类型参数
pub fn validate(kind: FunctionKind, raw: &Value) -> Result<CallArgs, ValidationError> {
    let descriptor = kind.descriptor();
    let map = parse_arguments(descriptor.name, raw)?;
    let args = check_schema(descriptor, &map)?;
    bind(kind, &args)
}

fn bind(kind: FunctionKind, args: &ValidatedArgs) -> Result<CallArgs, ValidationError> {
    match kind {
        FunctionKind::Weather => Ok(CallArgs::Weather(WeatherQuery {
            location: args.string("location")?,
        })),
        FunctionKind::Hotels => {
            let travellers = args.integer("travellers")?;
            let travellers = u32::try_from(travellers)
                .map_err(|_| argument_error(args.function, "travellers", "must be a positive number"))?;

            let query = HotelQuery {
                location: args.string("location")?,
                from_date: args.date("fromDate")?,
                to_date: args.date("toDate")?,
                travellers,
            };
            query
                .check()
                .map_err(|(parameter, detail)| argument_error(args.function, parameter, detail))?;

            Ok(CallArgs::Hotels(query))
        }
        FunctionKind::Flights => Ok(CallArgs::Flights(FlightQuery {
            from_city: args.string("fromCity")?,
            to_city: args.string("toCity")?,
            date: args.date("date")?,
        })),
    }
}
