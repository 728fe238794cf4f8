use serde::{Deserialize, Serialize};

/// A registered parameter: its path, current value and bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub path: String,
    pub value: ParamValue,
    pub min: f32,
    pub max: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Float(f32),
    Int(i32),
    Bool(bool),
    Text(String),
}

impl ParamValue {
    pub fn to_f32(&self) -> f32 {
        match self {
            ParamValue::Float(v) => *v,
            ParamValue::Int(v) => *v as f32,
            ParamValue::Bool(v) => if *v { 1.0 } else { 0.0 },
            ParamValue::Text(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    /// Truthiness used by toggle parameters: non-zero numbers are on.
    pub fn as_bool(&self) -> bool {
        match self {
            ParamValue::Bool(v) => *v,
            ParamValue::Text(s) => matches!(s.trim(), "on" | "true" | "1"),
            other => other.to_f32() >= 0.5,
        }
    }

    /// Integer position for enumerated parameters (direction, note duration).
    pub fn as_index(&self) -> usize {
        match self {
            ParamValue::Int(v) => (*v).max(0) as usize,
            other => other.to_f32().max(0.0).round() as usize,
        }
    }
}

impl ParamSpec {
    pub fn float(path: &str, value: f32, min: f32, max: f32) -> Self {
        Self {
            path: path.to_string(),
            value: ParamValue::Float(value.clamp(min, max)),
            min,
            max,
        }
    }

    pub fn int(path: &str, value: i32, min: i32, max: i32) -> Self {
        Self {
            path: path.to_string(),
            value: ParamValue::Int(value.clamp(min, max)),
            min: min as f32,
            max: max as f32,
        }
    }

    pub fn toggle(path: &str, value: bool) -> Self {
        Self {
            path: path.to_string(),
            value: ParamValue::Bool(value),
            min: 0.0,
            max: 1.0,
        }
    }

    /// Clamp an incoming value to this parameter's bounds, coercing to the
    /// registered value type.
    pub fn coerce(&self, value: ParamValue) -> ParamValue {
        match (&self.value, value) {
            (ParamValue::Float(_), v) => ParamValue::Float(v.to_f32().clamp(self.min, self.max)),
            (ParamValue::Int(_), ParamValue::Int(v)) => {
                ParamValue::Int(v.clamp(self.min as i32, self.max as i32))
            }
            (ParamValue::Int(_), v) => {
                ParamValue::Int((v.to_f32().round() as i32).clamp(self.min as i32, self.max as i32))
            }
            (ParamValue::Bool(_), v) => ParamValue::Bool(v.as_bool()),
            (ParamValue::Text(_), v @ ParamValue::Text(_)) => v,
            (ParamValue::Text(_), v) => ParamValue::Text(v.to_f32().to_string()),
        }
    }
}
