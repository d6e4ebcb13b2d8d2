//! DWARF tag, attribute and form codes.
//!
//! Codes are kept as transparent newtypes rather than closed enums: producers
//! emit vendor extensions freely and an unknown code must survive a round trip
//! through the engine unchanged.

use core::fmt;

macro_rules! dwarf_codes {
    ($(#[$meta:meta])* $ty:ident($repr:ty), $unknown:literal, { $($konst:ident = $val:literal => $name:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $ty(pub $repr);

        impl $ty {
            $(pub const $konst: $ty = $ty($val);)*

            /// Symbolic name of a known code.
            pub fn static_name(self) -> Option<&'static str> {
                match self.0 {
                    $($val => Some($name),)*
                    _ => None,
                }
            }

            /// Looks a code up by its symbolic name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$konst),)*
                    _ => None,
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.static_name() {
                    Some(name) => f.write_str(name),
                    None => write!(f, concat!($unknown, "{:#x}"), self.0),
                }
            }
        }
    };
}

dwarf_codes!(
    /// `DW_TAG_*`
    Tag(u16), "DW_TAG_", {
        ARRAY_TYPE = 0x01 => "DW_TAG_array_type",
        CLASS_TYPE = 0x02 => "DW_TAG_class_type",
        ENUMERATION_TYPE = 0x04 => "DW_TAG_enumeration_type",
        FORMAL_PARAMETER = 0x05 => "DW_TAG_formal_parameter",
        LEXICAL_BLOCK = 0x0b => "DW_TAG_lexical_block",
        MEMBER = 0x0d => "DW_TAG_member",
        POINTER_TYPE = 0x0f => "DW_TAG_pointer_type",
        COMPILE_UNIT = 0x11 => "DW_TAG_compile_unit",
        STRUCTURE_TYPE = 0x13 => "DW_TAG_structure_type",
        SUBROUTINE_TYPE = 0x15 => "DW_TAG_subroutine_type",
        TYPEDEF = 0x16 => "DW_TAG_typedef",
        UNION_TYPE = 0x17 => "DW_TAG_union_type",
        INLINED_SUBROUTINE = 0x1d => "DW_TAG_inlined_subroutine",
        SUBRANGE_TYPE = 0x21 => "DW_TAG_subrange_type",
        BASE_TYPE = 0x24 => "DW_TAG_base_type",
        CONST_TYPE = 0x26 => "DW_TAG_const_type",
        ENUMERATOR = 0x28 => "DW_TAG_enumerator",
        SUBPROGRAM = 0x2e => "DW_TAG_subprogram",
        VARIABLE = 0x34 => "DW_TAG_variable",
        VOLATILE_TYPE = 0x35 => "DW_TAG_volatile_type",
        NAMESPACE = 0x39 => "DW_TAG_namespace",
        PARTIAL_UNIT = 0x3c => "DW_TAG_partial_unit",
        TYPE_UNIT = 0x41 => "DW_TAG_type_unit",
    }
);

dwarf_codes!(
    /// `DW_AT_*`
    At(u16), "DW_AT_", {
        SIBLING = 0x01 => "DW_AT_sibling",
        LOCATION = 0x02 => "DW_AT_location",
        NAME = 0x03 => "DW_AT_name",
        ORDERING = 0x09 => "DW_AT_ordering",
        BYTE_SIZE = 0x0b => "DW_AT_byte_size",
        BIT_OFFSET = 0x0c => "DW_AT_bit_offset",
        BIT_SIZE = 0x0d => "DW_AT_bit_size",
        STMT_LIST = 0x10 => "DW_AT_stmt_list",
        LOW_PC = 0x11 => "DW_AT_low_pc",
        HIGH_PC = 0x12 => "DW_AT_high_pc",
        LANGUAGE = 0x13 => "DW_AT_language",
        DISCR_VALUE = 0x16 => "DW_AT_discr_value",
        VISIBILITY = 0x17 => "DW_AT_visibility",
        COMP_DIR = 0x1b => "DW_AT_comp_dir",
        CONST_VALUE = 0x1c => "DW_AT_const_value",
        INLINE = 0x20 => "DW_AT_inline",
        LOWER_BOUND = 0x22 => "DW_AT_lower_bound",
        PRODUCER = 0x25 => "DW_AT_producer",
        PROTOTYPED = 0x27 => "DW_AT_prototyped",
        START_SCOPE = 0x2c => "DW_AT_start_scope",
        BIT_STRIDE = 0x2e => "DW_AT_bit_stride",
        UPPER_BOUND = 0x2f => "DW_AT_upper_bound",
        ABSTRACT_ORIGIN = 0x31 => "DW_AT_abstract_origin",
        ACCESSIBILITY = 0x32 => "DW_AT_accessibility",
        ADDRESS_CLASS = 0x33 => "DW_AT_address_class",
        ARTIFICIAL = 0x34 => "DW_AT_artificial",
        CALLING_CONVENTION = 0x36 => "DW_AT_calling_convention",
        COUNT = 0x37 => "DW_AT_count",
        DATA_MEMBER_LOCATION = 0x38 => "DW_AT_data_member_location",
        DECL_COLUMN = 0x39 => "DW_AT_decl_column",
        DECL_FILE = 0x3a => "DW_AT_decl_file",
        DECL_LINE = 0x3b => "DW_AT_decl_line",
        DECLARATION = 0x3c => "DW_AT_declaration",
        ENCODING = 0x3e => "DW_AT_encoding",
        EXTERNAL = 0x3f => "DW_AT_external",
        FRAME_BASE = 0x40 => "DW_AT_frame_base",
        IDENTIFIER_CASE = 0x42 => "DW_AT_identifier_case",
        SPECIFICATION = 0x47 => "DW_AT_specification",
        TYPE = 0x49 => "DW_AT_type",
        VIRTUALITY = 0x4c => "DW_AT_virtuality",
        ALLOCATED = 0x4e => "DW_AT_allocated",
        ASSOCIATED = 0x4f => "DW_AT_associated",
        BYTE_STRIDE = 0x51 => "DW_AT_byte_stride",
        RANGES = 0x55 => "DW_AT_ranges",
        CALL_COLUMN = 0x57 => "DW_AT_call_column",
        CALL_FILE = 0x58 => "DW_AT_call_file",
        CALL_LINE = 0x59 => "DW_AT_call_line",
        BINARY_SCALE = 0x5b => "DW_AT_binary_scale",
        DECIMAL_SCALE = 0x5c => "DW_AT_decimal_scale",
        DECIMAL_SIGN = 0x5e => "DW_AT_decimal_sign",
        DIGIT_COUNT = 0x5f => "DW_AT_digit_count",
        ENDIANITY = 0x65 => "DW_AT_endianity",
        DATA_BIT_OFFSET = 0x6b => "DW_AT_data_bit_offset",
        LINKAGE_NAME = 0x6e => "DW_AT_linkage_name",
        GNU_ODR_SIGNATURE = 0x210f => "DW_AT_GNU_odr_signature",
    }
);

dwarf_codes!(
    /// `DW_FORM_*`
    Form(u16), "DW_FORM_", {
        ADDR = 0x01 => "DW_FORM_addr",
        BLOCK2 = 0x03 => "DW_FORM_block2",
        BLOCK4 = 0x04 => "DW_FORM_block4",
        DATA2 = 0x05 => "DW_FORM_data2",
        DATA4 = 0x06 => "DW_FORM_data4",
        DATA8 = 0x07 => "DW_FORM_data8",
        STRING = 0x08 => "DW_FORM_string",
        BLOCK = 0x09 => "DW_FORM_block",
        BLOCK1 = 0x0a => "DW_FORM_block1",
        DATA1 = 0x0b => "DW_FORM_data1",
        FLAG = 0x0c => "DW_FORM_flag",
        SDATA = 0x0d => "DW_FORM_sdata",
        STRP = 0x0e => "DW_FORM_strp",
        UDATA = 0x0f => "DW_FORM_udata",
        REF_ADDR = 0x10 => "DW_FORM_ref_addr",
        REF1 = 0x11 => "DW_FORM_ref1",
        REF2 = 0x12 => "DW_FORM_ref2",
        REF4 = 0x13 => "DW_FORM_ref4",
        REF8 = 0x14 => "DW_FORM_ref8",
        REF_UDATA = 0x15 => "DW_FORM_ref_udata",
        INDIRECT = 0x16 => "DW_FORM_indirect",
        SEC_OFFSET = 0x17 => "DW_FORM_sec_offset",
        EXPRLOC = 0x18 => "DW_FORM_exprloc",
        FLAG_PRESENT = 0x19 => "DW_FORM_flag_present",
        REF_SIG8 = 0x20 => "DW_FORM_ref_sig8",
        GNU_REF_ALT = 0x1f20 => "DW_FORM_GNU_ref_alt",
        GNU_STRP_ALT = 0x1f21 => "DW_FORM_GNU_strp_alt",
    }
);

impl Form {
    /// Byte width of the fixed-size constant forms `data1` .. `data8`.
    pub fn data_width(self) -> Option<u32> {
        match self {
            Form::DATA1 => Some(1),
            Form::DATA2 => Some(2),
            Form::DATA4 => Some(4),
            Form::DATA8 => Some(8),
            _ => None,
        }
    }

    /// Byte width of the fixed-size reference forms, `None` for the variable ones.
    pub fn ref_width(self) -> Option<u32> {
        match self {
            Form::REF1 => Some(1),
            Form::REF2 => Some(2),
            Form::REF4 => Some(4),
            Form::REF8 | Form::REF_ADDR => Some(8),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_have_dwarf_names() {
        assert_eq!(Tag::SUBPROGRAM.to_string(), "DW_TAG_subprogram");
        assert_eq!(At::BYTE_SIZE.to_string(), "DW_AT_byte_size");
        assert_eq!(Form::FLAG_PRESENT.to_string(), "DW_FORM_flag_present");
    }

    #[test]
    fn unknown_codes_print_as_hex() {
        assert_eq!(Tag(0x4107).to_string(), "DW_TAG_0x4107");
        assert_eq!(At(0x7fff).static_name(), None);
    }

    #[test]
    fn names_round_trip() {
        assert_eq!(At::from_name("DW_AT_decl_line"), Some(At::DECL_LINE));
        assert_eq!(Tag::from_name("DW_TAG_nonsense"), None);
    }
}
