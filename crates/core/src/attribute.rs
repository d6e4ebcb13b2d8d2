//! Attribute values and their decoding into typed data.

use core::fmt;

use crate::constant::Constant;
use crate::die::Die;
use crate::dwarf::{At, Form};
use crate::error::InfoError;

/// Raw attribute payload as the producer encoded it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrValue {
    Str(String),
    Unsigned(u64),
    Signed(i64),
    Flag(bool),
    Block(Vec<u8>),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<u64> for AttrValue {
    fn from(value: u64) -> Self {
        AttrValue::Unsigned(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Signed(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Flag(value)
    }
}

impl From<Vec<u8>> for AttrValue {
    fn from(value: Vec<u8>) -> Self {
        AttrValue::Block(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Attribute {
    pub name: At,
    pub form: Form,
    pub value: AttrValue,
}

/// What an attribute means once its form has been interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Str(String),
    Cst(Constant),
    Ref(Die),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signedness {
    Signed,
    Unsigned,
    Unimplemented,
}

const SIGNEDNESS: &[(At, Signedness)] = &[
    (At::BYTE_STRIDE, Signedness::Signed),
    (At::BIT_STRIDE, Signedness::Signed),
    (At::BINARY_SCALE, Signedness::Signed),
    (At::DECIMAL_SCALE, Signedness::Signed),
    (At::BYTE_SIZE, Signedness::Unsigned),
    (At::BIT_SIZE, Signedness::Unsigned),
    (At::BIT_OFFSET, Signedness::Unsigned),
    (At::DATA_BIT_OFFSET, Signedness::Unsigned),
    (At::LOWER_BOUND, Signedness::Unsigned),
    (At::UPPER_BOUND, Signedness::Unsigned),
    (At::COUNT, Signedness::Unsigned),
    (At::ALLOCATED, Signedness::Unsigned),
    (At::ASSOCIATED, Signedness::Unsigned),
    (At::START_SCOPE, Signedness::Unsigned),
    (At::DIGIT_COUNT, Signedness::Unsigned),
    (At::GNU_ODR_SIGNATURE, Signedness::Unsigned),
    (At::HIGH_PC, Signedness::Unsigned),
    (At::STMT_LIST, Signedness::Unsigned),
    (At::ORDERING, Signedness::Unsigned),
    (At::LANGUAGE, Signedness::Unsigned),
    (At::VISIBILITY, Signedness::Unsigned),
    (At::INLINE, Signedness::Unsigned),
    (At::ACCESSIBILITY, Signedness::Unsigned),
    (At::ADDRESS_CLASS, Signedness::Unsigned),
    (At::CALLING_CONVENTION, Signedness::Unsigned),
    (At::ENCODING, Signedness::Unsigned),
    (At::IDENTIFIER_CASE, Signedness::Unsigned),
    (At::VIRTUALITY, Signedness::Unsigned),
    (At::ENDIANITY, Signedness::Unsigned),
    (At::DECIMAL_SIGN, Signedness::Unsigned),
    (At::DECL_FILE, Signedness::Unsigned),
    (At::DECL_LINE, Signedness::Unsigned),
    (At::DECL_COLUMN, Signedness::Unsigned),
    (At::CALL_FILE, Signedness::Unsigned),
    (At::CALL_LINE, Signedness::Unsigned),
    (At::CALL_COLUMN, Signedness::Unsigned),
    // Signedness of these follows the type of the entity they belong to.
    (At::DISCR_VALUE, Signedness::Unimplemented),
    (At::CONST_VALUE, Signedness::Unimplemented),
];

/// How a fixed-size `DW_FORM_data*` value of attribute `at` is to be read.
pub fn data_signedness(at: At) -> Signedness {
    SIGNEDNESS
        .iter()
        .find(|(name, _)| *name == at)
        .map_or(Signedness::Unimplemented, |(_, signedness)| *signedness)
}

impl Attribute {
    pub fn new(name: At, form: Form, value: impl Into<AttrValue>) -> Self {
        Self { name, form, value: value.into() }
    }

    pub fn decode(&self) -> Result<Decoded, InfoError> {
        let form = self.form;
        match form {
            Form::STRING | Form::STRP | Form::GNU_STRP_ALT => Ok(Decoded::Str(self.string()?)),
            Form::SDATA => Ok(Decoded::Cst(Constant::signed(self.signed()?))),
            Form::UDATA | Form::SEC_OFFSET => Ok(Decoded::Cst(Constant::unsigned(self.unsigned()?))),
            Form::ADDR => Ok(Decoded::Cst(Constant::address(self.unsigned()?))),
            Form::FLAG | Form::FLAG_PRESENT => Ok(Decoded::Cst(Constant::boolean(self.flag()?))),
            Form::DATA1 | Form::DATA2 | Form::DATA4 | Form::DATA8 => self.decode_data(),
            Form::REF1 | Form::REF2 | Form::REF4 | Form::REF8 | Form::REF_ADDR | Form::REF_UDATA => {
                Ok(Decoded::Ref(Die(self.sized(form.ref_width())?)))
            }
            Form::BLOCK | Form::BLOCK1 | Form::BLOCK2 | Form::BLOCK4 | Form::EXPRLOC => match &self.value {
                AttrValue::Block(bytes) => Ok(Decoded::Bytes(bytes.clone())),
                _ => Err(self.malformed("expected a block")),
            },
            _ => Err(InfoError::Unimplemented(format!("decoding {} of {}", form, self.name))),
        }
    }

    fn decode_data(&self) -> Result<Decoded, InfoError> {
        let width = self.form.data_width();
        let raw = self.sized(width)?;
        match data_signedness(self.name) {
            Signedness::Unsigned => Ok(Decoded::Cst(Constant::unsigned(raw))),
            Signedness::Signed => {
                let shift = 64 - 8 * width.unwrap_or(8);
                Ok(Decoded::Cst(Constant::signed((raw << shift).cast_signed() >> shift)))
            }
            Signedness::Unimplemented => {
                Err(InfoError::Unimplemented(format!("signedness of {} in {}", self.name, self.form)))
            }
        }
    }

    /// Unsigned payload checked against the byte width of the form, if fixed.
    fn sized(&self, width: Option<u32>) -> Result<u64, InfoError> {
        let raw = self.unsigned()?;
        match width {
            Some(w) if w < 8 && raw >> (8 * w) != 0 => {
                Err(self.malformed(format!("value {raw:#x} does not fit in {w} bytes")))
            }
            _ => Ok(raw),
        }
    }

    fn unsigned(&self) -> Result<u64, InfoError> {
        match self.value {
            AttrValue::Unsigned(v) => Ok(v),
            _ => Err(self.malformed("expected an unsigned value")),
        }
    }

    fn signed(&self) -> Result<i64, InfoError> {
        match self.value {
            AttrValue::Signed(v) => Ok(v),
            _ => Err(self.malformed("expected a signed value")),
        }
    }

    fn flag(&self) -> Result<bool, InfoError> {
        match (self.form, &self.value) {
            (Form::FLAG_PRESENT, _) => Ok(true),
            (_, AttrValue::Flag(v)) => Ok(*v),
            (_, AttrValue::Unsigned(v)) => Ok(*v != 0),
            _ => Err(self.malformed("expected a flag")),
        }
    }

    fn string(&self) -> Result<String, InfoError> {
        match &self.value {
            AttrValue::Str(s) => Ok(s.clone()),
            _ => Err(self.malformed("expected a string")),
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> InfoError {
        InfoError::malformed(self.name, self.form, reason)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})\t", self.name, self.form)?;
        match &self.value {
            AttrValue::Str(s) => write!(f, "{s:?}"),
            AttrValue::Unsigned(v) => write!(f, "{v}"),
            AttrValue::Signed(v) => write!(f, "{v}"),
            AttrValue::Flag(v) => write!(f, "{v}"),
            AttrValue::Block(bytes) => {
                f.write_str("[")?;
                for (i, b) in bytes.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{b:#x}")?;
                }
                f.write_str("]")
            }
        }
    }
}
