use crate::value::Primary;

static NULL_VALUE: Primary = Primary::Null;

/// One column of a view: the view it is visible under, the column name,
/// and whether it came from a table (wildcard expansion and column
/// numbering only see table columns).
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderField {
    pub view: String,
    pub column: String,
    pub from_table: bool,
}

/// Ordered column list of a view. Lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    fields: Vec<HeaderField>,
}

/// Why a field reference failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSearchError {
    NotExist,
    Ambiguous,
}

impl Header {
    pub fn new(view: &str, columns: &[&str]) -> Self {
        Self {
            fields: columns
                .iter()
                .map(|c| HeaderField {
                    view: view.to_string(),
                    column: c.to_string(),
                    from_table: true,
                })
                .collect(),
        }
    }

    pub fn from_fields(fields: Vec<HeaderField>) -> Self {
        Self { fields }
    }

    pub fn push(&mut self, field: HeaderField) {
        self.fields.push(field);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[HeaderField] {
        &self.fields
    }

    pub fn get(&self, i: usize) -> Option<&HeaderField> {
        self.fields.get(i)
    }

    /// Resolves a (view, column) reference to a cell index. A missing view
    /// qualifier matches any view; more than one match is ambiguous.
    pub fn search(&self, view: Option<&str>, column: &str) -> Result<usize, FieldSearchError> {
        let mut found: Option<usize> = None;
        for (i, field) in self.fields.iter().enumerate() {
            if !field.column.eq_ignore_ascii_case(column) {
                continue;
            }
            if let Some(view) = view {
                if !field.view.eq_ignore_ascii_case(view) {
                    continue;
                }
            }
            if found.is_some() {
                return Err(FieldSearchError::Ambiguous);
            }
            found = Some(i);
        }
        found.ok_or(FieldSearchError::NotExist)
    }

    /// Resolves `view.N` to a cell index: the N-th (1-based) table column
    /// of that view.
    pub fn search_number(&self, view: &str, number: i64) -> Option<usize> {
        if number < 1 {
            return None;
        }
        let mut seen = 0i64;
        for (i, field) in self.fields.iter().enumerate() {
            if field.from_table && field.view.eq_ignore_ascii_case(view) {
                seen += 1;
                if seen == number {
                    return Some(i);
                }
            }
        }
        None
    }

    /// Cell indexes expanded by `*` or `view.*`.
    pub fn wildcard_indexes(&self, view: Option<&str>) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| {
                f.from_table
                    && view.map_or(true, |v| f.view.eq_ignore_ascii_case(v))
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Renames the view every table column is visible under; aliasing a
    /// table re-qualifies its columns.
    pub fn with_view_name(mut self, view: &str) -> Self {
        for field in &mut self.fields {
            if field.from_table {
                field.view = view.to_string();
            }
        }
        self
    }

    pub fn merge(left: &Header, right: &Header) -> Header {
        let mut fields = left.fields.clone();
        fields.extend(right.fields.iter().cloned());
        Header { fields }
    }
}

/// One field of one row. Plain cells hold a single value; grouped cells
/// keep the backing list of source values for aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    values: Vec<Primary>,
}

impl Cell {
    pub fn new(value: Primary) -> Self {
        Self { values: vec![value] }
    }

    pub fn grouped(values: Vec<Primary>) -> Self {
        Self { values }
    }

    /// The representative value: the cell's value, or the first of the
    /// backing list after grouping. NULL for an empty group.
    pub fn value(&self) -> &Primary {
        self.values.first().unwrap_or(&NULL_VALUE)
    }

    pub fn group_len(&self) -> usize {
        self.values.len()
    }

    /// A plain cell appended to a grouped record holds one value shared
    /// by every member, so out-of-range member access falls back to it.
    pub fn group_value(&self, i: usize) -> &Primary {
        self.values.get(i).unwrap_or_else(|| self.value())
    }

    pub fn group_values(&self) -> &[Primary] {
        &self.values
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(pub Vec<Cell>);

impl Record {
    pub fn from_values(values: Vec<Primary>) -> Self {
        Self(values.into_iter().map(Cell::new).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Member count of the group this record stands for; 1 for plain rows.
    pub fn group_len(&self) -> usize {
        self.0.first().map_or(0, Cell::group_len)
    }

    pub fn values(&self) -> Vec<Primary> {
        self.0.iter().map(|c| c.value().clone()).collect()
    }
}

pub type RecordSet = Vec<Record>;

/// An in-memory tabular result: a header plus records whose cells run
/// parallel to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct View {
    pub header: Header,
    pub records: RecordSet,
    pub is_grouped: bool,
}

impl View {
    pub fn new(header: Header) -> Self {
        Self { header, records: Vec::new(), is_grouped: false }
    }

    pub fn record_len(&self) -> usize {
        self.records.len()
    }

    pub fn field_len(&self) -> usize {
        self.header.len()
    }
}
