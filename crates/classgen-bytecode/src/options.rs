/// Emitter configuration.
///
/// ```
/// use classgen_bytecode::WriterOptions;
///
/// let options = WriterOptions::default().with_switch_density(0.75);
/// assert_eq!(options.switch_density, 0.75);
/// assert_eq!(options.major_version, 49);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WriterOptions {
    /// Class file major version. No stack map frames are written, so the
    /// default stays below 50.
    pub major_version: u16,
    /// Minimum `labels / (high - low + 1)` for a jump table; sparser
    /// switches use a sorted lookup table.
    pub switch_density: f64,
    /// Add a no-argument constructor to classes that declare none.
    pub generate_default_constructor: bool,
    /// Write generic `Signature` attributes.
    pub emit_signatures: bool,
    /// Write `RuntimeVisibleAnnotations` attributes.
    pub emit_annotations: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            major_version: 49,
            switch_density: 0.5,
            generate_default_constructor: true,
            emit_signatures: true,
            emit_annotations: true,
        }
    }
}

impl WriterOptions {
    pub fn with_major_version(mut self, major_version: u16) -> Self {
        self.major_version = major_version;
        self
    }

    pub fn with_switch_density(mut self, density: f64) -> Self {
        self.switch_density = density;
        self
    }

    pub fn with_default_constructor(mut self, generate: bool) -> Self {
        self.generate_default_constructor = generate;
        self
    }

    pub fn with_signatures(mut self, emit: bool) -> Self {
        self.emit_signatures = emit;
        self
    }

    pub fn with_annotations(mut self, emit: bool) -> Self {
        self.emit_annotations = emit;
        self
    }
}
