use super::cv::Accession;
use super::scanner::ContextStack;

/// Which part of the document the scanner is in. The header ends at the
/// `<run>` start tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    Header,
    Spectra,
}

/// The mutable scanning state threaded through every handler
#[derive(Debug, Default, Clone)]
pub struct ParserState {
    /// The active context label that qualifies accession lookups
    pub context: String,
    pub stack: ContextStack,
    pub section: Section,
}

impl ParserState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave the header and enter the spectrum section
    pub fn enter_spectra(&mut self) {
        self.section = Section::Spectra;
    }

    pub fn set_context<S: Into<String>>(&mut self, context: S) {
        self.context = context.into();
    }

    pub fn clear_context(&mut self) {
        self.context.clear();
    }
}

/**
Maps accessions to actions of type `A`.

Every pass has a fixed table of accessions it always understands, given as
a plain function, plus any number of entries only valid while the parser is in
a particular context. Context-qualified entries are consulted first, and only
when a context is active.
*/
#[derive(Debug, Clone)]
pub struct DispatchTable<A: Copy> {
    bare: fn(Accession) -> Option<A>,
    qualified: Vec<(Accession, Box<str>, A)>,
}

impl<A: Copy> DispatchTable<A> {
    pub fn new(bare: fn(Accession) -> Option<A>) -> Self {
        Self {
            bare,
            qualified: Vec::new(),
        }
    }

    /// Register `action` for `accession` when it occurs within `context`,
    /// replacing any earlier registration for the same pair.
    pub fn register_in_context<S: Into<Box<str>>>(
        &mut self,
        accession: Accession,
        context: S,
        action: A,
    ) {
        let context = context.into();
        if let Some(entry) = self
            .qualified
            .iter_mut()
            .find(|(acc, ctx, _)| *acc == accession && *ctx == context)
        {
            entry.2 = action;
        } else {
            self.qualified.push((accession, context, action));
        }
    }

    pub fn lookup_in_context(&self, accession: Accession, context: &str) -> Option<A> {
        self.qualified
            .iter()
            .find(|(acc, ctx, _)| *acc == accession && ctx.as_ref() == context)
            .map(|(_, _, action)| *action)
    }

    pub fn lookup_bare(&self, accession: Accession) -> Option<A> {
        (self.bare)(accession)
    }

    /// Resolve `accession` in `context`, trying the qualified entry before the
    /// bare one.
    pub fn lookup(&self, accession: Accession, context: &str) -> Option<A> {
        if !context.is_empty() {
            if let Some(action) = self.lookup_in_context(accession, context) {
                return Some(action);
            }
        }
        self.lookup_bare(accession)
    }

    /// Like [`DispatchTable::lookup`] but for the raw accession text. Text that
    /// is not a recognised accession never matches.
    pub fn lookup_str(&self, accession: &str, context: &str) -> Option<A> {
        accession
            .parse::<Accession>()
            .ok()
            .and_then(|acc| self.lookup(acc, context))
    }
}
