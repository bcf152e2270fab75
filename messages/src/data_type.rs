// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2024 Oxide Computer Company

//! The closed set of primitive types used by flight software fields.

use crate::Error;
use serde::Deserialize;
use serde::Serialize;

/// The broad family a wire data type belongs to.
///
/// The field codec branches on this to pick an encoding.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Empty,
    Number,
    Boolean,
    Enum,
    String,
    VarString,
    IrisByteString,
}

impl Category {
    /// The numeric code used by the flight software for this category.
    pub const fn code(&self) -> i8 {
        match self {
            Category::Empty => -1,
            Category::Number => 0,
            Category::Boolean => 1,
            Category::Enum => 2,
            Category::String => 3,
            Category::VarString => 4,
            Category::IrisByteString => 5,
        }
    }

    /// Return true for the length-prefixed categories.
    pub const fn is_length_prefixed(&self) -> bool {
        matches!(
            self,
            Category::String | Category::VarString | Category::IrisByteString
        )
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let s = match self {
            Category::Empty => "empty",
            Category::Number => "number",
            Category::Boolean => "boolean",
            Category::Enum => "enum",
            Category::String => "string",
            Category::VarString => "varstring",
            Category::IrisByteString => "byte-string",
        };
        write!(f, "{s}")
    }
}

/// A primitive flight software data type.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(test, derive(strum::EnumIter))]
#[cfg_attr(feature = "api-traits", derive(schemars::JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FswDataType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Enum,
    String5,
    String6,
    String8,
    String10,
    String15,
    String24,
    String39,
    String40,
    String50,
    String240,
    #[serde(rename = "VARSTRING_255")]
    VarString255,
    #[serde(rename = "VARSTRING_10K")]
    VarString10k,
    #[serde(rename = "IRISBYTESTRING134")]
    IrisByteString134,
    Invalid,
}

impl FswDataType {
    pub const fn category(&self) -> Category {
        use FswDataType::*;
        match self {
            Bool => Category::Boolean,
            I8 | I16 | I32 | I64 | U8 | U16 | U32 | U64 | F32 | F64 => Category::Number,
            Enum => Category::Enum,
            String5 | String6 | String8 | String10 | String15 | String24 | String39
            | String40 | String50 | String240 => Category::String,
            VarString255 | VarString10k => Category::VarString,
            IrisByteString134 => Category::IrisByteString,
            Invalid => Category::Empty,
        }
    }

    /// The fixed size of this type, or the maximum size including the 2-byte
    /// length prefix for strings.
    pub const fn num_octets(&self) -> usize {
        use FswDataType::*;
        match self {
            Bool | I8 | U8 => 1,
            I16 | U16 => 2,
            I32 | U32 | F32 | Enum => 4,
            I64 | U64 | F64 => 8,
            String5 => 5 + 2,
            String6 => 6 + 2,
            String8 => 8 + 2,
            String10 => 10 + 2,
            String15 => 15 + 2,
            String24 => 24 + 2,
            String39 => 39 + 2,
            String40 => 40 + 2,
            String50 => 50 + 2,
            String240 => 240 + 2,
            VarString255 => 255 + 2,
            VarString10k => 10_000 + 2,
            IrisByteString134 => 134 + 2,
            Invalid => 0,
        }
    }

    pub const fn num_bits(&self) -> usize {
        self.num_octets() * 8
    }

    pub const fn is_signed(&self) -> bool {
        use FswDataType::*;
        matches!(self, I8 | I16 | I32 | I64 | F32 | F64)
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, FswDataType::F32 | FswDataType::F64)
    }

    /// The flight software (F Prime) name of the type.
    pub const fn name(&self) -> &'static str {
        use FswDataType::*;
        match self {
            Bool => "BOOL",
            I8 => "I8",
            I16 => "I16",
            I32 => "I32",
            I64 => "I64",
            U8 => "U8",
            U16 => "U16",
            U32 => "U32",
            U64 => "U64",
            F32 => "F32",
            F64 => "F64",
            Enum => "ENUM",
            String5 => "STRING5",
            String6 => "STRING6",
            String8 => "STRING8",
            String10 => "STRING10",
            String15 => "STRING15",
            String24 => "STRING24",
            String39 => "STRING39",
            String40 => "STRING40",
            String50 => "STRING50",
            String240 => "STRING240",
            VarString255 => "VARSTRING_255",
            VarString10k => "VARSTRING_10K",
            IrisByteString134 => "IRISBYTESTRING134",
            Invalid => "INVALID",
        }
    }

    /// The C-style name of the type, as used in the flight software headers.
    pub const fn c_name(&self) -> &'static str {
        use FswDataType::*;
        match self {
            Bool => "bool",
            I8 => "int8",
            I16 => "int16",
            I32 => "int32",
            I64 => "int64",
            U8 => "uint8",
            U16 => "uint16",
            U32 => "uint32",
            U64 => "uint64",
            F32 => "float",
            F64 => "double",
            Enum => "enum/*int32*/",
            String5 => "char[5]",
            String6 => "char[6]",
            String8 => "char[8]",
            String10 => "char[10]",
            String15 => "char[15]",
            String24 => "char[24]",
            String39 => "char[39]",
            String40 => "char[40]",
            String50 => "char[50]",
            String240 => "char[240]",
            VarString255 => "char[/*up to*/255]",
            VarString10k => "char[/*up to*/10000]",
            IrisByteString134 => "char[/*up to*/134]",
            Invalid => "invalid",
        }
    }

    const ALL: [FswDataType; 26] = {
        use FswDataType::*;
        [
            Bool,
            I8,
            I16,
            I32,
            I64,
            U8,
            U16,
            U32,
            U64,
            F32,
            F64,
            Enum,
            String5,
            String6,
            String8,
            String10,
            String15,
            String24,
            String39,
            String40,
            String50,
            String240,
            VarString255,
            VarString10k,
            IrisByteString134,
            Invalid,
        ]
    };
}

impl core::fmt::Display for FswDataType {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl core::str::FromStr for FswDataType {
    type Err = Error;

    /// Look up a type by its F Prime name (case-insensitive) or its C-style
    /// name, with any `_t` suffix removed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        if upper == "BOOLEAN" {
            return Ok(FswDataType::Bool);
        }
        let c_name = s.replace("_t", "");
        Self::ALL
            .iter()
            .find(|t| t.name() == upper || t.c_name() == c_name)
            .copied()
            .ok_or_else(|| Error::UnknownDataType(s.to_string()))
    }
}
