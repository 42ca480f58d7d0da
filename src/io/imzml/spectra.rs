//! The second pass over an imzML document, which builds one [`SpectrumRecord`]
//! per `<spectrum>` element inside the `<run>`.
use std::io::prelude::*;

use log::{debug, trace};

use crate::meta::keys;
use crate::params::PropertyStore;
use crate::spectrum::{ArrayType, SpectrumRecord};

use super::cv::{Accession, ContextTag};
use super::dispatch::{DispatchTable, ParserState, Section};
use super::header::Axis;
use super::reading_shared::{parse_number, ImzMLParserError, ImzMLParserState, ParserResult};
use super::scanner::{Line, LineKind, LineScanner};
use super::zaxis::resolve_z_axis;

/// What to do with a recognised term inside the spectrum list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectrumAction {
    /// A 1-based pixel coordinate
    Position(Axis),
    MzOffset,
    MzLength,
    IntensityOffset,
    IntensityLength,
    NormalizationFactor,
}

fn spectrum_action(accession: Accession) -> Option<SpectrumAction> {
    match accession {
        Accession::PositionX => Some(SpectrumAction::Position(Axis::X)),
        Accession::PositionY => Some(SpectrumAction::Position(Axis::Y)),
        Accession::PositionZ => Some(SpectrumAction::Position(Axis::Z)),
        Accession::TotalIonCurrent => Some(SpectrumAction::NormalizationFactor),
        _ => None,
    }
}

/// The ids of the referenceable param groups describing a document's m/z and
/// intensity arrays, as recorded by the first pass over that document
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrayGroups {
    pub mz: Option<String>,
    pub intensity: Option<String>,
}

impl ArrayGroups {
    pub fn from_store<P: PropertyStore>(store: &P) -> Self {
        let group_id = |group_name_key: &str| {
            store
                .get_text(group_name_key)
                .and_then(|name| store.get_text(name))
                .filter(|id| !id.is_empty())
                .map(|id| id.to_string())
        };
        Self {
            mz: group_id(keys::MZ_GROUP_NAME),
            intensity: group_id(keys::INTENSITY_GROUP_NAME),
        }
    }

    pub fn get(&self, array: ArrayType) -> ParserResult<&str> {
        let id = match array {
            ArrayType::MZArray => self.mz.as_deref(),
            ArrayType::IntensityArray => self.intensity.as_deref(),
        };
        id.ok_or(ImzMLParserError::MissingArrayGroup(array.name()))
    }
}

/// Which binary array locations the current spectrum has declared
#[derive(Debug, Default, Clone, Copy)]
struct ArrayLocations {
    mz_offset: bool,
    mz_length: bool,
    int_offset: bool,
    int_length: bool,
}

impl ArrayLocations {
    fn missing(&self) -> Option<ArrayType> {
        if !(self.mz_offset && self.mz_length) {
            Some(ArrayType::MZArray)
        } else if !(self.int_offset && self.int_length) {
            Some(ArrayType::IntensityArray)
        } else {
            None
        }
    }
}

/// The records read by the second pass before the z axis is resolved
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SpectrumIndex {
    pub records: Vec<SpectrumRecord>,
    /// Whether any spectrum carried a physical z position
    pub world_z: bool,
}

/**
A line-driven builder for the `<spectrumList>` of an imzML file. Everything
before the `<run>` start tag is skipped.
*/
pub struct SpectrumIndexBuilder<'a, P: PropertyStore> {
    store: &'a mut P,
    state: ParserState,
    parser_state: ImzMLParserState,
    table: DispatchTable<SpectrumAction>,
    declared: Option<usize>,
    cursor: usize,
    locations: ArrayLocations,
    index: SpectrumIndex,
}

impl<'a, P: PropertyStore> SpectrumIndexBuilder<'a, P> {
    /// Create a builder, which requires the first pass to have found the groups
    /// describing the m/z and intensity arrays.
    pub fn new(store: &'a mut P, groups: &ArrayGroups) -> ParserResult<Self> {
        let mz_group = groups.get(ArrayType::MZArray)?;
        let intensity_group = groups.get(ArrayType::IntensityArray)?;
        debug!("Binary array groups: m/z = {mz_group}, intensity = {intensity_group}");

        let mut table = DispatchTable::new(spectrum_action);
        table.register_in_context(Accession::ExternalOffset, mz_group, SpectrumAction::MzOffset);
        table.register_in_context(
            Accession::ExternalArrayLength,
            mz_group,
            SpectrumAction::MzLength,
        );
        table.register_in_context(
            Accession::ExternalOffset,
            intensity_group,
            SpectrumAction::IntensityOffset,
        );
        table.register_in_context(
            Accession::ExternalArrayLength,
            intensity_group,
            SpectrumAction::IntensityLength,
        );

        Ok(Self {
            store,
            state: ParserState::new(),
            parser_state: ImzMLParserState::Start,
            table,
            declared: None,
            cursor: 0,
            locations: ArrayLocations::default(),
            index: SpectrumIndex::default(),
        })
    }

    /// Consume lines from `scanner` until the end of the spectrum list
    pub fn scan<R: BufRead>(&mut self, scanner: &mut LineScanner<R>) -> ParserResult {
        loop {
            let line = match scanner.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => return Err(ImzMLParserError::IOError(self.parser_state, e)),
            };
            if !self.handle_line(line)? {
                break;
            }
        }
        Ok(())
    }

    fn handle_line(&mut self, line: Line<'_>) -> ParserResult<bool> {
        if self.state.section == Section::Header {
            if line.kind() == LineKind::Opening && line.tag_name() == Some("run") {
                self.state.enter_spectra();
                self.parser_state = ImzMLParserState::Run;
            }
            return Ok(true);
        }

        match line.kind() {
            LineKind::Closing => {
                self.state.stack.pop();
                self.state.clear_context();
                match line.closing_tag_name() {
                    Some("spectrum") => {
                        if let Some(array) = self.locations.missing() {
                            return Err(ImzMLParserError::MissingArrayLocation {
                                spectrum: self.cursor,
                                array: array.name(),
                                line_number: line.number(),
                            });
                        }
                        self.cursor += 1;
                        self.parser_state = ImzMLParserState::SpectrumList;
                    }
                    Some("spectrumList") => {
                        self.parser_state = ImzMLParserState::SpectrumListDone;
                        return Ok(false);
                    }
                    _ => {}
                }
            }
            LineKind::SelfClosing => match line.accession() {
                Some(accession) => {
                    match self.table.lookup_str(accession, &self.state.context) {
                        Some(action) => self.apply(action, line)?,
                        None => trace!(
                            "Ignoring {accession} in context {:?} on line {}",
                            self.state.context,
                            line.number()
                        ),
                    }
                }
                None => self.handle_tag(line)?,
            },
            LineKind::Opening => {
                if let Some(tag) = line.tag_name() {
                    self.state.stack.push(tag);
                }
                self.handle_tag(line)?;
            }
            LineKind::Text => {}
        }
        Ok(true)
    }

    fn handle_tag(&mut self, line: Line<'_>) -> ParserResult {
        match line.tag_name().and_then(ContextTag::from_tag) {
            Some(ContextTag::SpectrumList) => {
                let count: usize = parse_number(
                    line.attribute_or_empty("count"),
                    "count",
                    line.as_str(),
                    line.number(),
                    ImzMLParserState::SpectrumList,
                )?;
                debug!("Spectrum list declares {count} spectra");
                self.store
                    .set_property(keys::NUMBER_OF_MEASUREMENTS, count);
                self.declared = Some(count);
                self.index.records.resize(count, SpectrumRecord::default());
                self.parser_state = ImzMLParserState::SpectrumList;
            }
            Some(ContextTag::Spectrum) => {
                self.parser_state = ImzMLParserState::Spectrum;
                self.locations = ArrayLocations::default();
                self.record_mut()?.index[Axis::Z as usize] = 0;
            }
            Some(ContextTag::ReferenceableParamGroupRef) => {
                self.state.set_context(line.attribute_or_empty("ref"));
            }
            _ => {
                let axis = match line.attribute_or_empty("name") {
                    "3DPositionX" => Axis::X,
                    "3DPositionY" => Axis::Y,
                    "3DPositionZ" => Axis::Z,
                    _ => return Ok(()),
                };
                let value: f64 = self.value(line)?;
                self.record_mut()?.world[axis as usize] = value;
                if axis == Axis::Z {
                    self.index.world_z = true;
                }
            }
        }
        Ok(())
    }

    fn value<T: std::str::FromStr>(&self, line: Line<'_>) -> ParserResult<T> {
        parse_number(
            line.attribute_or_empty("value"),
            "value",
            line.as_str(),
            line.number(),
            self.parser_state,
        )
    }

    fn record_mut(&mut self) -> ParserResult<&mut SpectrumRecord> {
        let Some(declared) = self.declared else {
            return Err(ImzMLParserError::MissingSpectrumList);
        };
        let found = self.cursor + 1;
        self.index
            .records
            .get_mut(self.cursor)
            .ok_or(ImzMLParserError::SpectrumCountMismatch { declared, found })
    }

    fn apply(&mut self, action: SpectrumAction, line: Line<'_>) -> ParserResult {
        match action {
            SpectrumAction::Position(axis) => {
                let value: u32 = self.value(line)?;
                let Some(index) = value.checked_sub(1) else {
                    return Err(ImzMLParserError::InvalidCoordinate {
                        line_number: line.number(),
                        value: value as u64,
                        line: line.as_str().trim().to_string(),
                    });
                };
                self.record_mut()?.index[axis as usize] = index;
            }
            SpectrumAction::MzOffset => {
                let value: u64 = self.value(line)?;
                self.record_mut()?.mz_offset = value;
                self.locations.mz_offset = true;
            }
            SpectrumAction::MzLength => {
                let value: u64 = self.value(line)?;
                self.record_mut()?.mz_length = value;
                self.locations.mz_length = true;
            }
            SpectrumAction::IntensityOffset => {
                let value: u64 = self.value(line)?;
                self.record_mut()?.int_offset = value;
                self.locations.int_offset = true;
            }
            SpectrumAction::IntensityLength => {
                let value: u64 = self.value(line)?;
                self.record_mut()?.int_length = value;
                self.locations.int_length = true;
            }
            SpectrumAction::NormalizationFactor => {
                let value: f64 = self.value(line)?;
                self.record_mut()?.in_file_normalization_factor = value;
            }
        }
        Ok(())
    }

    /// Check that every declared spectrum was read and hand back the records
    pub fn finish(self) -> ParserResult<SpectrumIndex> {
        let Some(declared) = self.declared else {
            return Err(ImzMLParserError::MissingSpectrumList);
        };
        if self.cursor != declared {
            return Err(ImzMLParserError::SpectrumCountMismatch {
                declared,
                found: self.cursor,
            });
        }
        Ok(self.index)
    }
}

/// Run the second pass over `reader`, returning one record per spectrum with
/// the z axis resolved. `store` must already hold the first pass's output.
pub fn parse_spectra<R: BufRead, P: PropertyStore>(
    reader: R,
    store: &mut P,
) -> ParserResult<Vec<SpectrumRecord>> {
    let groups = ArrayGroups::from_store(&*store);
    parse_spectra_with_groups(reader, &groups, store)
}

/// Like [`parse_spectra`], but with the array groups of this document given
/// explicitly rather than read from `store`, which may hold another
/// document's header.
pub fn parse_spectra_with_groups<R: BufRead, P: PropertyStore>(
    reader: R,
    groups: &ArrayGroups,
    store: &mut P,
) -> ParserResult<Vec<SpectrumRecord>> {
    let mut scanner = LineScanner::new(reader);
    let mut builder = SpectrumIndexBuilder::new(store, groups)?;
    builder.scan(&mut scanner)?;
    let SpectrumIndex {
        mut records,
        world_z,
    } = builder.finish()?;
    debug!(
        "Read {} spectra in {} lines",
        records.len(),
        scanner.line_number()
    );
    resolve_z_axis(&mut records, world_z, store);
    Ok(records)
}
