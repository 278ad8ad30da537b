use crate::field_type::FieldType;

/// Defines one key field of a flow record.
///
/// Fields are compared in the order they were added; the first field that
/// compares unequal decides the ordering of two records.
///
/// # Examples
/// ```
/// // sort by the 2 byte destination port stored at record offset 8
/// use flow_record_sort::field::Field;
/// use flow_record_sort::field_type::FieldType;
/// let field = Field::new(8, 2, FieldType::Uint)
///     .with_str_name("dport");
/// ```
#[derive(Clone, Debug)]
pub struct Field {
    name: String,
    offset: usize,
    width: usize,
    field_type: FieldType,
}

impl Field {
    /// Create a new [Field]
    ///
    /// # Arguments
    /// * `offset` - byte offset of the field. For [FieldType::KeySuffix] the
    ///   offset addresses the node's key-suffix region; for all other types
    ///   it addresses the raw record.
    /// * `width` - width of the field in bytes. Ignored for
    ///   [FieldType::Addr], whose width is set by the address family.
    /// * `field_type` - the type of the field. See [FieldType] for supported
    ///   types
    ///
    /// # Examples
    /// ```
    /// use flow_record_sort::field::Field;
    /// use flow_record_sort::field_type::FieldType;
    /// let field = Field::new(0, 4, FieldType::Addr);
    /// ```
    pub fn new(offset: usize, width: usize, field_type: FieldType) -> Field {
        Field {
            name: String::new(),
            offset,
            width,
            field_type,
        }
    }

    /// Get the name for this field.
    pub fn name(&self) -> &String {
        &self.name
    }

    /// Get the byte offset for this field.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Get the width in bytes for this field.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get the [FieldType] for this field.
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    /// Specify a name for this field
    pub fn with_name(mut self, name: String) -> Field {
        self.name = name;
        self
    }

    /// Specify a name for this field as &str
    pub fn with_str_name(mut self, name: &str) -> Field {
        self.name = name.to_string();
        self
    }

    /// Specify the byte offset for this field.
    pub fn with_offset(mut self, offset: usize) -> Field {
        self.offset = offset;
        self
    }

    /// Specify the width in bytes for this field.
    pub fn with_width(mut self, width: usize) -> Field {
        self.width = width;
        self
    }

    /// Specify the field type for this field. See [FieldType] for supported
    /// types.
    pub fn with_field_type(mut self, field_type: FieldType) -> Field {
        self.field_type = field_type;
        self
    }

    pub(crate) fn describe(&self) -> String {
        if self.name.is_empty() {
            format!("field at offset {}", self.offset)
        } else {
            format!("field '{}'", self.name)
        }
    }
}
