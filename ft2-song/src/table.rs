//! Instrument table with generation-checked handles
//!
//! Channels and voices never hold references into instrument storage. They
//! hold an [`InstrumentHandle`] (slot index + generation) and resolve it on
//! use, so an instrument that was freed or replaced while the engine was
//! paused reads as "absent" instead of dangling.

use std::sync::Arc;

use crate::{Instrument, MAX_INSTRUMENTS, Sample, SongError};

/// Stable reference to an instrument slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstrumentHandle {
    /// Slot index (0 = placeholder, 1-128 = instrument)
    pub index: u8,
    /// Slot generation at the time the handle was taken
    pub generation: u32,
}

impl InstrumentHandle {
    /// Handle to the placeholder slot
    pub const PLACEHOLDER: Self = Self {
        index: 0,
        generation: 0,
    };

    pub fn is_placeholder(&self) -> bool {
        self.index == 0
    }
}

#[derive(Debug, Clone)]
struct Slot {
    instrument: Option<Arc<Instrument>>,
    generation: u32,
}

/// Fixed-size instrument table
///
/// Slot 0 always holds the placeholder instrument: one silent sample with
/// volume 0, used by channels that have not seen an instrument yet.
#[derive(Debug, Clone)]
pub struct InstrumentTable {
    slots: Vec<Slot>,
    placeholder: Arc<Instrument>,
}

impl Default for InstrumentTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InstrumentTable {
    pub fn new() -> Self {
        let mut placeholder_sample = Sample::default();
        placeholder_sample.volume = 0;
        let placeholder = Arc::new(Instrument::with_sample(placeholder_sample));

        let mut slots = vec![
            Slot {
                instrument: None,
                generation: 0,
            };
            MAX_INSTRUMENTS + 1
        ];
        slots[0].instrument = Some(Arc::clone(&placeholder));
        Self { slots, placeholder }
    }

    fn check_slot(index: usize) -> Result<(), SongError> {
        if (1..=MAX_INSTRUMENTS).contains(&index) {
            Ok(())
        } else {
            Err(SongError::InstrumentSlot(index))
        }
    }

    /// Store an instrument in slot 1-128, replacing what was there
    pub fn insert(
        &mut self,
        index: usize,
        instrument: Instrument,
    ) -> Result<InstrumentHandle, SongError> {
        Self::check_slot(index)?;
        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        slot.instrument = Some(Arc::new(instrument));
        Ok(InstrumentHandle {
            index: index as u8,
            generation: slot.generation,
        })
    }

    /// Allocate an empty instrument with 16 default samples (volume 64, pan 128)
    pub fn allocate(&mut self, index: usize) -> Result<InstrumentHandle, SongError> {
        let samples = (0..crate::MAX_SAMPLES_PER_INSTRUMENT)
            .map(|_| Sample::default())
            .collect();
        self.insert(index, Instrument::with_samples(samples)?)
    }

    /// Free a slot; outstanding handles become stale
    pub fn free(&mut self, index: usize) -> Result<Option<Arc<Instrument>>, SongError> {
        Self::check_slot(index)?;
        let slot = &mut self.slots[index];
        slot.generation = slot.generation.wrapping_add(1);
        Ok(slot.instrument.take())
    }

    /// Edit an instrument in place; outstanding handles become stale
    pub fn modify<R>(
        &mut self,
        index: usize,
        edit: impl FnOnce(&mut Instrument) -> R,
    ) -> Result<Option<R>, SongError> {
        Self::check_slot(index)?;
        let slot = &mut self.slots[index];
        let Some(instrument) = slot.instrument.as_mut() else {
            return Ok(None);
        };
        slot.generation = slot.generation.wrapping_add(1);
        Ok(Some(edit(Arc::make_mut(instrument))))
    }

    /// Current handle for a slot, `None` when the slot is empty or out of range
    pub fn handle(&self, index: usize) -> Option<InstrumentHandle> {
        let slot = self.slots.get(index)?;
        slot.instrument.as_ref()?;
        Some(InstrumentHandle {
            index: index as u8,
            generation: slot.generation,
        })
    }

    /// Instrument by slot number, ignoring generations
    pub fn get(&self, index: usize) -> Option<&Instrument> {
        self.slots.get(index)?.instrument.as_deref()
    }

    /// Shared pointer to an instrument slot
    pub fn get_shared(&self, index: usize) -> Option<Arc<Instrument>> {
        self.slots.get(index)?.instrument.clone()
    }

    /// Resolve a handle; stale or empty handles give `None`
    pub fn resolve(&self, handle: InstrumentHandle) -> Option<&Instrument> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.instrument.as_deref()
    }

    /// Resolve a handle, falling back to the placeholder instrument
    pub fn resolve_or_placeholder(&self, handle: InstrumentHandle) -> &Instrument {
        match self.resolve(handle) {
            Some(instrument) => instrument,
            None => self.placeholder(),
        }
    }

    /// Sample behind a handle and slot, `None` if either is gone
    pub fn sample(&self, handle: InstrumentHandle, sample: u8) -> Option<&Sample> {
        self.resolve(handle)?.sample(sample as usize)
    }

    pub fn placeholder(&self) -> &Instrument {
        &self.placeholder
    }

    /// Iterate over populated slots 1-128
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Instrument)> {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(i, slot)| slot.instrument.as_deref().map(|ins| (i, ins)))
    }
}
