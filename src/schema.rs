//! Canonical record shape and export rules for the activity grid.

/// Columns of the activity grid, in on-screen order.
pub const ACTIVITY_COLUMNS: [&str; 33] = [
    "inizio",
    "fine",
    "utente",
    "tipo attivita",
    "durata",
    "tempo fatturabile",
    "importo attivita",
    "importo aggiuntivo",
    "importo di viaggio",
    "importo altri elementi",
    "importo articoli",
    "importo totale",
    "stato fatturazione",
    "contatto",
    "commessa",
    "referente",
    "indirizzo",
    "etichetta",
    "completata",
    "approvata",
    "note in report",
    "Note interne",
    "incarico",
    "rapportino",
    "importo spese",
    "Email contatto",
    "telefono contatto",
    "FAX contatto",
    "Email referente",
    "telefono referente",
    "cellulare referente",
    "fax referente",
    "rapportino inviato il",
];

/// Rows with a value here get a drill-down lookup.
pub const KEY_FIELD: &str = "incarico";

/// Supplementary column filled by the row enrichor.
pub const ENRICHMENT_COLUMN: &str = "incarico_extracted";

/// Columns dropped before export.
pub const NON_EXPORTED_COLUMNS: [&str; 17] = [
    "importo attivita",
    "importo aggiuntivo",
    "importo di viaggio",
    "importo altri elementi",
    "importo articoli",
    "importo totale",
    "indirizzo",
    "incarico",
    "rapportino",
    "importo spese",
    "telefono contatto",
    "FAX contatto",
    "Email referente",
    "telefono referente",
    "cellulare referente",
    "fax referente",
    "rapportino inviato il",
];

/// Columns rendered as checkbox icons in the grid.
pub const BOOLEAN_COLUMNS: [&str; 2] = ["completata", "approvata"];

/// Cell text of a ticked checkbox icon.
pub const CHECKED_MARKER: &str = "check_box";

/// Ordered, fixed-width column set every extracted row is coerced to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn activity() -> Self {
        Self::new(ACTIVITY_COLUMNS)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::activity()
    }
}

/// How the assembled dataset is shaped for export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRules {
    pub drop_columns: Vec<String>,
    pub boolean_columns: Vec<String>,
    pub checked_marker: String,
    /// Trailing rows discarded after concatenation (summary/footer rows).
    pub drop_trailing_rows: usize,
}

impl ExportRules {
    pub fn activity(drop_trailing_rows: usize) -> Self {
        Self {
            drop_columns: NON_EXPORTED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            boolean_columns: BOOLEAN_COLUMNS.iter().map(|c| c.to_string()).collect(),
            checked_marker: CHECKED_MARKER.to_string(),
            drop_trailing_rows,
        }
    }
}

impl Default for ExportRules {
    fn default() -> Self {
        Self::activity(1)
    }
}
