use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Named numeric width profiles consumed by the overflow and division
/// checkers
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum NumericalSize {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float8,
    Float16,
    Float32,
}

impl NumericalSize {
    pub fn min(&self) -> f64 {
        match self {
            Self::Int8 => -128.0,
            Self::UInt8 => 0.0,
            Self::Int16 => -32768.0,
            Self::UInt16 => 0.0,
            Self::Int32 => -2147483648.0,
            Self::UInt32 => 0.0,
            Self::Float8 => -127.0,
            Self::Float16 => -65504.0,
            Self::Float32 => -3.4028235e38,
        }
    }

    pub fn max(&self) -> f64 {
        match self {
            Self::Int8 => 127.0,
            Self::UInt8 => 255.0,
            Self::Int16 => 32767.0,
            Self::UInt16 => 65535.0,
            Self::Int32 => 2147483647.0,
            Self::UInt32 => 4294967295.0,
            Self::Float8 => 127.0,
            Self::Float16 => 65504.0,
            Self::Float32 => 3.4028235e38,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Float8 => "float8",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
        }
    }

    pub fn is_floating_point(&self) -> bool {
        matches!(self, Self::Float8 | Self::Float16 | Self::Float32)
    }

    /// Magnitude under which a nonzero floating divisor is flagged for
    /// precision loss
    pub fn epsilon(&self) -> Option<f64> {
        match self {
            Self::Float8 => Some(1e-2),
            Self::Float16 => Some(1e-3),
            Self::Float32 => Some(1e-6),
            _ => None,
        }
    }

    pub fn is_near_zero(&self, value: f64) -> bool {
        match self.epsilon() {
            None => false,
            Some(epsilon) => value != 0.0 && value.abs() < epsilon,
        }
    }
}

impl Display for NumericalSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

impl FromStr for NumericalSize {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let size = match s {
            "int8" => Self::Int8,
            "uint8" => Self::UInt8,
            "int16" => Self::Int16,
            "uint16" => Self::UInt16,
            "int32" => Self::Int32,
            "uint32" => Self::UInt32,
            "float8" => Self::Float8,
            "float16" => Self::Float16,
            "float32" => Self::Float32,
            _ => return Err("invalid numerical size"),
        };
        Ok(size)
    }
}
