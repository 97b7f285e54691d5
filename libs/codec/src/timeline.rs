//! Timeline record decoder
//!
//! Certain packets carry a nested stream of timeline records, each
//! introduced by a 32-bit declaration id. The decoder walks the
//! payload, validates every declaration id against the closed record
//! set and hands each decoded record to an observer immediately; it
//! keeps no state across calls beyond the current offset. Long-term
//! storage belongs to the observer, not the decoder.

use num_enum::TryFromPrimitive;
use tracing::{debug, trace};
use types::ProfilingGuid;

use crate::error::{CodecError, CodecResult};
use crate::swtrace::{decode_string, read_sw_trace_message, SwTraceMessage};
use crate::wire::{read_u32, read_u64, TargetEndianness};

/// Record-kind selector at the head of every nested timeline record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
pub enum DeclId {
    Label = 0,
    Entity = 1,
    EventClass = 2,
    Relationship = 3,
    Event = 4,
}

/// Kind of link a relationship record declares between two guids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
pub enum RelationshipType {
    RetentionLink = 0,
    ExecutionLink = 1,
    DataLink = 2,
    LabelLink = 3,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub guid: ProfilingGuid,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entity {
    pub guid: ProfilingGuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventClass {
    pub guid: ProfilingGuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relationship {
    pub relationship_type: RelationshipType,
    pub guid: ProfilingGuid,
    pub head_guid: ProfilingGuid,
    pub tail_guid: ProfilingGuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub thread_id: u64,
    pub guid: ProfilingGuid,
}

/// Receiver for decoded records. Each record is delivered exactly once,
/// in payload order.
pub trait TimelineObserver {
    fn on_label(&mut self, label: Label);
    fn on_entity(&mut self, entity: Entity);
    fn on_event_class(&mut self, event_class: EventClass);
    fn on_relationship(&mut self, relationship: Relationship);
    fn on_event(&mut self, event: Event);
}

/// Default observer accumulating records as growable ordered sequences.
#[derive(Debug, Default)]
pub struct TimelineModel {
    pub labels: Vec<Label>,
    pub entities: Vec<Entity>,
    pub event_classes: Vec<EventClass>,
    pub relationships: Vec<Relationship>,
    pub events: Vec<Event>,
}

impl TimelineObserver for TimelineModel {
    fn on_label(&mut self, label: Label) {
        self.labels.push(label);
    }

    fn on_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    fn on_event_class(&mut self, event_class: EventClass) {
        self.event_classes.push(event_class);
    }

    fn on_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    fn on_event(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// Decoder for the nested record stream inside a timeline packet.
#[derive(Debug, Clone, Copy)]
pub struct TimelineDecoder {
    endianness: TargetEndianness,
    thread_id_size: u32,
}

impl TimelineDecoder {
    /// `thread_id_size` is the producer's thread-id width in bytes,
    /// 4 or 8, fixed for the connection.
    pub fn new(endianness: TargetEndianness, thread_id_size: u32) -> CodecResult<Self> {
        if thread_id_size != 4 && thread_id_size != 8 {
            return Err(CodecError::UnsupportedThreadIdWidth {
                width: thread_id_size,
            });
        }
        Ok(Self {
            endianness,
            thread_id_size,
        })
    }

    /// Decode every record in `payload`, pushing each one to the
    /// observer as soon as it is complete.
    pub fn decode(
        &self,
        payload: &[u8],
        observer: &mut dyn TimelineObserver,
    ) -> CodecResult<()> {
        let endianness = self.endianness;
        let mut offset = 0;
        while offset < payload.len() {
            let raw_id = read_u32(payload, offset, endianness)?;
            let decl_id = DeclId::try_from(raw_id)
                .map_err(|_| CodecError::UnknownDeclId { decl_id: raw_id })?;
            offset += 4;
            trace!(?decl_id, offset, "decoding timeline record");

            match decl_id {
                DeclId::Label => {
                    let guid = ProfilingGuid(read_u64(payload, offset, endianness)?);
                    offset += 8;
                    let (name, used) = decode_string(payload, offset, endianness)?;
                    offset += used;
                    observer.on_label(Label { guid, name });
                }
                DeclId::Entity => {
                    let guid = ProfilingGuid(read_u64(payload, offset, endianness)?);
                    offset += 8;
                    observer.on_entity(Entity { guid });
                }
                DeclId::EventClass => {
                    let guid = ProfilingGuid(read_u64(payload, offset, endianness)?);
                    offset += 8;
                    observer.on_event_class(EventClass { guid });
                }
                DeclId::Relationship => {
                    let raw_type = read_u32(payload, offset, endianness)?;
                    let relationship_type = RelationshipType::try_from(raw_type)
                        .map_err(|_| CodecError::UnknownRelationshipType { value: raw_type })?;
                    offset += 4;
                    let guid = ProfilingGuid(read_u64(payload, offset, endianness)?);
                    let head_guid = ProfilingGuid(read_u64(payload, offset + 8, endianness)?);
                    let tail_guid = ProfilingGuid(read_u64(payload, offset + 16, endianness)?);
                    offset += 24;
                    observer.on_relationship(Relationship {
                        relationship_type,
                        guid,
                        head_guid,
                        tail_guid,
                    });
                }
                DeclId::Event => {
                    let timestamp = read_u64(payload, offset, endianness)?;
                    offset += 8;
                    let thread_id = if self.thread_id_size == 4 {
                        let narrow = read_u32(payload, offset, endianness)?;
                        u64::from(narrow)
                    } else {
                        read_u64(payload, offset, endianness)?
                    };
                    offset += self.thread_id_size as usize;
                    let guid = ProfilingGuid(read_u64(payload, offset, endianness)?);
                    offset += 8;
                    observer.on_event(Event {
                        timestamp,
                        thread_id,
                        guid,
                    });
                }
            }
        }
        Ok(())
    }
}

/// The decoded timeline message directory: stream format declarations
/// plus one [`SwTraceMessage`] per record kind the producer will emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineDirectory {
    pub stream_version: u8,
    pub pointer_bytes: u8,
    pub thread_id_bytes: u8,
    pub declarations: Vec<SwTraceMessage>,
}

impl TimelineDirectory {
    /// Parse a directory packet payload: three u8 width declarations,
    /// a u32 declaration count, then the declarations themselves.
    pub fn parse(payload: &[u8], endianness: TargetEndianness) -> CodecResult<Self> {
        if payload.len() < 7 {
            return Err(CodecError::truncated(7, payload.len(), "timeline directory"));
        }
        let stream_version = payload[0];
        let pointer_bytes = payload[1];
        let thread_id_bytes = payload[2];
        let count = read_u32(payload, 3, endianness)?;

        let mut declarations = Vec::with_capacity(count as usize);
        let mut offset = 7;
        for _ in 0..count {
            let (message, used) = read_sw_trace_message(payload, offset, endianness)?;
            offset += used;
            declarations.push(message);
        }
        debug!(
            stream_version,
            pointer_bytes,
            thread_id_bytes,
            declarations = declarations.len(),
            "parsed timeline directory"
        );
        Ok(Self {
            stream_version,
            pointer_bytes,
            thread_id_bytes,
            declarations,
        })
    }
}
