use crate::client::fetcher::RangeRequest;
use crate::core::api::{RefSequence, SnpResponse};
use crate::core::types::{QueryType, ViewMode};
use crate::viewport::jump::{self, JumpError, JumpTarget};
use crate::viewport::scale::Viewport;

/// Marker drawn at the position the user jumped to, visible in base view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionMarker {
    pub position: u64,
    /// SNP id or formatted position shown next to the marker
    pub label: String,
}

/// Readsets, sequences and pan/zoom state of one viewer.
///
/// Every piece of state the viewer needs lives here; create one session per
/// plot. A session decides *what* to fetch ([`ViewerSession::range_request`]);
/// fetching itself is left to a [`ReadFetcher`](crate::client::fetcher::ReadFetcher).
#[derive(Debug, Clone)]
pub struct ViewerSession {
    width: f64,
    char_width: f64,
    backend: Option<String>,
    readset_ids: Vec<String>,
    sequences: Vec<RefSequence>,
    current: Option<RefSequence>,
    viewport: Option<Viewport>,
    marker: Option<PositionMarker>,
}

impl ViewerSession {
    pub fn new(width: f64, char_width: f64) -> Self {
        Self {
            width,
            char_width,
            backend: None,
            readset_ids: Vec::new(),
            sequences: Vec::new(),
            current: None,
            viewport: None,
            marker: None,
        }
    }

    pub fn readset_ids(&self) -> &[String] {
        &self.readset_ids
    }

    pub fn backend(&self) -> Option<&str> {
        self.backend.as_deref()
    }

    pub fn sequences(&self) -> &[RefSequence] {
        &self.sequences
    }

    pub fn current_sequence(&self) -> Option<&RefSequence> {
        self.current.as_ref()
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    pub fn viewport_mut(&mut self) -> Option<&mut Viewport> {
        self.viewport.as_mut()
    }

    pub fn marker(&self) -> Option<&PositionMarker> {
        self.marker.as_ref()
    }

    pub fn has_readset(&self, id: &str) -> bool {
        self.readset_ids.iter().any(|r| r == id)
    }

    /// Add a readset. The first readset defines the sequence list and clears
    /// any previous selection.
    pub fn add_readset(
        &mut self,
        backend: Option<String>,
        id: impl Into<String>,
        sequences: Vec<RefSequence>,
    ) {
        let id = id.into();
        if self.has_readset(&id) {
            return;
        }
        self.backend = backend;
        self.readset_ids.push(id);
        if self.readset_ids.len() == 1 {
            self.sequences = sequences;
            self.clear_selection();
        }
    }

    /// Remove a readset; removing the last one empties the sequence list
    pub fn remove_readset(&mut self, id: &str) {
        self.readset_ids.retain(|r| r != id);
        if self.readset_ids.is_empty() {
            self.sequences.clear();
            self.clear_selection();
        }
    }

    fn clear_selection(&mut self) {
        self.current = None;
        self.viewport = None;
        self.marker = None;
    }

    /// Select a sequence by name and show its middle at read level
    ///
    /// # Errors
    ///
    /// Returns `JumpError::SequenceNotFound` when no sequence matches `name`.
    pub fn select_sequence(&mut self, name: &str) -> Result<(), JumpError> {
        let sequence = jump::fuzzy_find_sequence(&self.sequences, name)
            .cloned()
            .ok_or_else(|| JumpError::SequenceNotFound(name.to_string()))?;
        let middle = sequence.length / 2;
        self.set_sequence(sequence);
        self.jump_to(middle, None, false, None)
    }

    fn set_sequence(&mut self, sequence: RefSequence) {
        self.viewport = Some(Viewport::new(sequence.length, self.width, self.char_width));
        self.current = Some(sequence);
    }

    /// Move to `position`, optionally switching to `chr` first.
    ///
    /// In base view the position is marked and the plot zooms to base
    /// resolution; otherwise it zooms to read level. The session is left
    /// untouched when the jump fails.
    ///
    /// # Errors
    ///
    /// Returns `JumpError::SequenceNotFound` for an unknown `chr`,
    /// `JumpError::NoSequence` when nothing is selected and no `chr` is given,
    /// and `JumpError::PositionOutOfRange` when `position` is past the end.
    pub fn jump_to(
        &mut self,
        position: u64,
        chr: Option<&str>,
        base_view: bool,
        label: Option<String>,
    ) -> Result<(), JumpError> {
        let sequence = match chr {
            Some(chr) => jump::fuzzy_find_sequence(&self.sequences, chr)
                .cloned()
                .ok_or_else(|| JumpError::SequenceNotFound(chr.to_string()))?,
            None => self.current.clone().ok_or(JumpError::NoSequence)?,
        };
        let position = jump::check_position(&sequence, position)?;

        if self.current.as_ref() != Some(&sequence) {
            self.set_sequence(sequence);
        }

        self.marker = base_view.then(|| PositionMarker {
            position,
            label: label.unwrap_or_else(|| jump::format_position(position)),
        });

        if let Some(viewport) = self.viewport.as_mut() {
            let zoom = *viewport.zoom_model();
            let scale = if base_view {
                zoom.base_zoom()
            } else {
                zoom.read_zoom()
            };
            viewport.set_scale(scale);
            #[allow(clippy::cast_precision_loss)]
            let position = position as f64;
            viewport.center_on(position);
        }
        Ok(())
    }

    /// Jump to a numbered position on the current sequence.
    ///
    /// SNP targets need a lookup first; see [`ViewerSession::jump_to_snp`].
    ///
    /// # Errors
    ///
    /// See [`ViewerSession::jump_to`]; a SNP target yields `JumpError::InvalidPosition`.
    pub fn jump(&mut self, target: &JumpTarget) -> Result<(), JumpError> {
        match target {
            JumpTarget::Position(position) => self.jump_to(*position, None, true, None),
            JumpTarget::Snp(name) => Err(JumpError::InvalidPosition(name.clone())),
        }
    }

    /// Jump to the location of a SNP lookup result, labelled with the SNP id
    ///
    /// # Errors
    ///
    /// Returns `JumpError::SnpNotFound` when the lookup found nothing, or any
    /// error of [`ViewerSession::jump_to`].
    pub fn jump_to_snp(&mut self, query: &str, response: &SnpResponse) -> Result<(), JumpError> {
        let (chr, position) = jump::snp_location(query, response)?;
        self.jump_to(position, Some(&chr), true, Some(query.to_string()))
    }

    pub fn view_mode(&self) -> Option<ViewMode> {
        self.viewport.as_ref().map(Viewport::view_mode)
    }

    /// Reads to fetch for the visible range, if the view shows reads
    pub fn range_request(&self) -> Option<RangeRequest> {
        let viewport = self.viewport.as_ref()?;
        let sequence = self.current.as_ref()?;
        if self.readset_ids.is_empty() || !viewport.view_mode().shows_reads() {
            return None;
        }
        let (start, end) = viewport.visible_range();
        Some(RangeRequest {
            readset_ids: self.readset_ids.clone(),
            sequence_name: sequence.name.clone(),
            start,
            end,
            query_type: QueryType::Reads,
        })
    }
}

/// Display title of a sequence in the sequence list
pub fn sequence_title(name: &str) -> String {
    if name.contains('X') {
        return "Chromosome X".to_string();
    }
    if name.contains('Y') {
        return "Chromosome Y".to_string();
    }
    let number: String = name.chars().filter(char::is_ascii_digit).collect();
    match number.parse::<u32>() {
        Ok(n) if n > 0 && n < 23 => format!("Chromosome {n}"),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequences() -> Vec<RefSequence> {
        vec![
            RefSequence {
                name: "chr1".to_string(),
                length: 1_000_000,
            },
            RefSequence {
                name: "chr2".to_string(),
                length: 500_000,
            },
        ]
    }

    fn session() -> ViewerSession {
        let mut session = ViewerSession::new(1000.0, 10.0);
        session.add_readset(None, "rs-a", sequences());
        session
    }

    #[test]
    fn test_first_readset_defines_sequences() {
        let mut session = session();
        assert_eq!(session.sequences().len(), 2);
        session.add_readset(None, "rs-b", Vec::new());
        assert_eq!(session.sequences().len(), 2);
        assert_eq!(session.readset_ids(), ["rs-a", "rs-b"]);

        session.remove_readset("rs-a");
        assert_eq!(session.sequences().len(), 2);
        session.remove_readset("rs-b");
        assert!(session.sequences().is_empty());
        assert!(session.current_sequence().is_none());
    }

    #[test]
    fn test_select_sequence_zooms_to_reads_in_the_middle() {
        let mut session = session();
        session.select_sequence("2").unwrap();
        assert_eq!(session.current_sequence().unwrap().name, "chr2");
        assert_eq!(session.view_mode(), Some(ViewMode::Reads));
        assert!(session.marker().is_none());

        let request = session.range_request().unwrap();
        assert_eq!(request.sequence_name, "chr2");
        assert!(request.start < 250_000 && request.end > 250_000);
    }

    #[test]
    fn test_jump_to_base_view_sets_marker() {
        let mut session = session();
        session.select_sequence("chr1").unwrap();
        session.jump(&JumpTarget::Position(12_345)).unwrap();
        assert_eq!(session.view_mode(), Some(ViewMode::Bases));
        assert_eq!(
            session.marker(),
            Some(&PositionMarker {
                position: 12_345,
                label: "12,345".to_string()
            })
        );
    }

    #[test]
    fn test_failed_jump_keeps_state() {
        let mut session = session();
        session.select_sequence("chr2").unwrap();
        let before = session.range_request();

        let err = session.jump_to(600_000, None, true, None).unwrap_err();
        assert!(matches!(err, JumpError::PositionOutOfRange { .. }));
        let err = session.jump_to(10, Some("chrZ"), true, None).unwrap_err();
        assert_eq!(err, JumpError::SequenceNotFound("chrZ".to_string()));

        assert_eq!(session.current_sequence().unwrap().name, "chr2");
        assert_eq!(session.range_request(), before);
    }

    #[test]
    fn test_jump_without_sequence() {
        let mut session = session();
        assert_eq!(
            session.jump(&JumpTarget::Position(5)),
            Err(JumpError::NoSequence)
        );
    }

    #[test]
    fn test_jump_to_snp_switches_sequence() {
        let mut session = session();
        session.select_sequence("chr1").unwrap();
        let response = SnpResponse {
            position: 1000,
            chr: "2".to_string(),
            name: "rs99".to_string(),
            link: String::new(),
        };
        session.jump_to_snp("rs99", &response).unwrap();
        assert_eq!(session.current_sequence().unwrap().name, "chr2");
        assert_eq!(session.marker().unwrap().label, "rs99");

        let missing = SnpResponse::not_found("rs0");
        assert_eq!(
            session.jump_to_snp("rs0", &missing),
            Err(JumpError::SnpNotFound("rs0".to_string()))
        );
    }

    #[test]
    fn test_no_request_when_zoomed_out() {
        let mut session = session();
        session.select_sequence("chr1").unwrap();
        session.viewport_mut().unwrap().set_scale(1.0);
        assert_eq!(session.view_mode(), Some(ViewMode::Summary));
        assert!(session.range_request().is_none());
    }

    #[test]
    fn test_sequence_title() {
        assert_eq!(sequence_title("chrX"), "Chromosome X");
        assert_eq!(sequence_title("chr7"), "Chromosome 7");
        assert_eq!(sequence_title("22"), "Chromosome 22");
        assert_eq!(sequence_title("chrM"), "chrM");
        assert_eq!(sequence_title("chr1_gl000191_random"), "chr1_gl000191_random");
    }
}
