//! Event parser.
//!
//! The parser turns tokens into [`Event`]s following the YAML grammar:
//!
//! ```text
//! stream            ::= STREAM-START implicit_document? explicit_document* STREAM-END
//! implicit_document ::= block_node DOCUMENT-END*
//! explicit_document ::= DIRECTIVE* DOCUMENT-START block_node? DOCUMENT-END*
//! block_node        ::= ALIAS | properties block_content? | block_content
//! flow_node         ::= ALIAS | properties flow_content? | flow_content
//! properties        ::= TAG ANCHOR? | ANCHOR TAG?
//! block_collection  ::= block_sequence | block_mapping
//! block_sequence    ::= BLOCK-SEQUENCE-START (BLOCK-ENTRY block_node?)* BLOCK-END
//! block_mapping     ::= BLOCK-MAPPING_START
//!                       ((KEY block_node_or_indentless_sequence?)?
//!                       (VALUE block_node_or_indentless_sequence?)?)* BLOCK-END
//! flow_sequence     ::= FLOW-SEQUENCE-START
//!                       (flow_sequence_entry FLOW-ENTRY)* flow_sequence_entry? FLOW-SEQUENCE-END
//! flow_mapping      ::= FLOW-MAPPING-START
//!                       (flow_mapping_entry FLOW-ENTRY)* flow_mapping_entry? FLOW-MAPPING-END
//! ```
//!
//! Nesting is tracked with an explicit stack of pending productions rather
//! than with recursive calls, so deeply nested input cannot overflow the
//! call stack. Each call to [`Parser::next_event`] runs exactly one
//! production.
//!
//! Comment tokens are lifted out of the token stream as they are met and
//! emitted as comment events ahead of the next structural event.

use std::collections::VecDeque;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::anchor::Anchor;
use crate::common::{FlowStyle, ScalarStyle, SpecVersion};
use crate::error::{MarkedError, Result, YamlError};
use crate::events::{Event, EventId, EventKind, ImplicitTuple};
use crate::mark::Mark;
use crate::scanner::Scanner;
use crate::settings::{LoadSettings, VersionCheck};
use crate::tag::YAML_PREFIX;
use crate::tokens::{Directive, Token, TokenId, TokenKind};

/// What the parser expects to produce next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Production {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentEnd,
    DocumentContent,
    BlockNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
    End,
}

fn default_tag_handles() -> IndexMap<String, String> {
    let mut handles = IndexMap::new();
    handles.insert("!".to_string(), "!".to_string());
    handles.insert("!!".to_string(), YAML_PREFIX.to_string());
    handles
}

/// Event parser over a [`Scanner`].
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    state: Production,
    states: Vec<Production>,
    marks: Vec<Option<Mark>>,
    events: VecDeque<Event>,
    pending_comments: Vec<Token>,
    tag_handles: IndexMap<String, String>,
    version_check: VersionCheck,
}

impl<'a> Parser<'a> {
    pub fn new(scanner: Scanner<'a>, settings: &LoadSettings) -> Self {
        Self {
            scanner,
            state: Production::StreamStart,
            states: Vec::new(),
            marks: Vec::new(),
            events: VecDeque::new(),
            pending_comments: Vec::new(),
            tag_handles: default_tag_handles(),
            version_check: settings.version_check.clone(),
        }
    }

    /// Whether the next event is one of `ids` (any event when `ids` is empty).
    pub fn check_event(&mut self, ids: &[EventId]) -> Result<bool> {
        self.fill()?;
        Ok(match self.events.front() {
            None => false,
            Some(event) => ids.is_empty() || ids.contains(&event.id()),
        })
    }

    /// The next event without consuming it; `None` once the stream ended.
    pub fn peek_event(&mut self) -> Result<Option<&Event>> {
        self.fill()?;
        Ok(self.events.front())
    }

    /// Consume and return the next event.
    ///
    /// Fails with [`YamlError::Exhausted`] after `StreamEnd` was returned.
    pub fn next_event(&mut self) -> Result<Event> {
        self.fill()?;
        let event = self.events.pop_front().ok_or(YamlError::Exhausted)?;
        trace!(
            event = ?event.id(),
            line = event.start.as_ref().map(|m| m.line),
            column = event.start.as_ref().map(|m| m.column),
            "event"
        );
        Ok(event)
    }

    fn fill(&mut self) -> Result<()> {
        while self.events.is_empty() && self.state != Production::End {
            let event = self.produce()?;
            for comment in self.pending_comments.drain(..) {
                let (kind, start, end) = comment.into_parts();
                if let TokenKind::Comment {
                    comment_type,
                    value,
                } = kind
                {
                    self.events.push_back(Event::new(
                        EventKind::Comment {
                            comment_type,
                            value,
                        },
                        start,
                        end,
                    ));
                }
            }
            self.events.push_back(event);
        }
        Ok(())
    }

    fn produce(&mut self) -> Result<Event> {
        match self.state {
            Production::StreamStart => self.parse_stream_start(),
            Production::ImplicitDocumentStart => self.parse_implicit_document_start(),
            Production::DocumentStart => self.parse_document_start(),
            Production::DocumentEnd => self.parse_document_end(),
            Production::DocumentContent => self.parse_document_content(),
            Production::BlockNode => self.parse_node(true, false),
            Production::BlockSequenceFirstEntry => self.parse_block_sequence_first_entry(),
            Production::BlockSequenceEntry => self.parse_block_sequence_entry(),
            Production::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            Production::BlockMappingFirstKey => self.parse_block_mapping_first_key(),
            Production::BlockMappingKey => self.parse_block_mapping_key(),
            Production::BlockMappingValue => self.parse_block_mapping_value(),
            Production::FlowSequenceFirstEntry => self.parse_flow_sequence_first_entry(),
            Production::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            Production::FlowSequenceEntryMappingKey => {
                self.parse_flow_sequence_entry_mapping_key()
            }
            Production::FlowSequenceEntryMappingValue => {
                self.parse_flow_sequence_entry_mapping_value()
            }
            Production::FlowSequenceEntryMappingEnd => {
                self.parse_flow_sequence_entry_mapping_end()
            }
            Production::FlowMappingFirstKey => self.parse_flow_mapping_first_key(),
            Production::FlowMappingKey => self.parse_flow_mapping_key(false),
            Production::FlowMappingValue => self.parse_flow_mapping_value(),
            Production::FlowMappingEmptyValue => self.parse_flow_mapping_empty_value(),
            Production::End => Err(YamlError::Exhausted),
        }
    }

    // ========================================================================
    // Token access
    // ========================================================================

    fn skip_comments(&mut self) -> Result<()> {
        while self.scanner.check_token(&[TokenId::Comment])? {
            if let Some(token) = self.scanner.next_token()? {
                self.pending_comments.push(token);
            }
        }
        Ok(())
    }

    fn check_token(&mut self, ids: &[TokenId]) -> Result<bool> {
        self.skip_comments()?;
        self.scanner.check_token(ids)
    }

    fn peek_token(&mut self) -> Result<&Token> {
        self.skip_comments()?;
        match self.scanner.peek_token()? {
            Some(token) => Ok(token),
            None => Err(YamlError::Exhausted),
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_comments()?;
        self.scanner.next_token()?.ok_or(YamlError::Exhausted)
    }

    fn pop_state(&mut self) {
        self.state = self.states.pop().unwrap_or(Production::End);
    }

    /// Error for an unexpected token: `"{expected}, but {verb} '{token}'"`.
    fn unexpected(
        &mut self,
        context: &str,
        context_mark: Option<Mark>,
        expected: &str,
        verb: &str,
    ) -> YamlError {
        match self.peek_token() {
            Ok(token) => {
                let problem = format!("{}, but {} '{}'", expected, verb, token.id());
                let mark = token.start().cloned();
                YamlError::parser(Some(context), context_mark, problem, mark)
            }
            Err(err) => err,
        }
    }

    fn empty_scalar(mark: Option<Mark>) -> Event {
        Event::new(
            EventKind::Scalar {
                anchor: None,
                tag: None,
                implicit: ImplicitTuple::new(true, false),
                value: String::new(),
                style: ScalarStyle::Plain,
            },
            mark.clone(),
            mark,
        )
    }

    // ========================================================================
    // Stream and documents
    // ========================================================================

    fn parse_stream_start(&mut self) -> Result<Event> {
        let token = self.next_token()?;
        self.state = Production::ImplicitDocumentStart;
        let (_, start, end) = token.into_parts();
        Ok(Event::new(EventKind::StreamStart, start, end))
    }

    fn parse_implicit_document_start(&mut self) -> Result<Event> {
        if self.check_token(&[
            TokenId::Directive,
            TokenId::DocumentStart,
            TokenId::StreamEnd,
        ])? {
            return self.parse_document_start();
        }
        self.tag_handles = default_tag_handles();
        let mark = self.peek_token()?.start().cloned();
        self.states.push(Production::DocumentEnd);
        self.state = Production::BlockNode;
        debug!(explicit = false, "document start");
        Ok(Event::new(
            EventKind::DocumentStart {
                explicit: false,
                version: None,
                tags: IndexMap::new(),
            },
            mark.clone(),
            mark,
        ))
    }

    fn parse_document_start(&mut self) -> Result<Event> {
        // Extra document end markers are allowed.
        while self.check_token(&[TokenId::DocumentEnd])? {
            self.next_token()?;
        }

        if self.check_token(&[TokenId::StreamEnd])? {
            let token = self.next_token()?;
            let (_, start, end) = token.into_parts();
            self.state = Production::End;
            return Ok(Event::new(EventKind::StreamEnd, start, end));
        }

        let start = self.peek_token()?.start().cloned();
        let (version, tags) = self.process_directives()?;
        if !self.check_token(&[TokenId::DocumentStart])? {
            let token = self.peek_token()?;
            let problem = format!("expected '<document start>', but found '{}'", token.id());
            let mark = token.start().cloned();
            return Err(YamlError::parser(None, None, problem, mark));
        }
        let token = self.next_token()?;
        let end = token.end().cloned();
        self.states.push(Production::DocumentEnd);
        self.state = Production::DocumentContent;
        debug!(explicit = true, version = ?version, tags = tags.len(), "document start");
        Ok(Event::new(
            EventKind::DocumentStart {
                explicit: true,
                version,
                tags,
            },
            start,
            end,
        ))
    }

    fn parse_document_end(&mut self) -> Result<Event> {
        let mut start = self.peek_token()?.start().cloned();
        let mut end = start.clone();
        let explicit = self.check_token(&[TokenId::DocumentEnd])?;
        if explicit {
            let token = self.next_token()?;
            let (_, token_start, token_end) = token.into_parts();
            start = token_start;
            end = token_end;
        } else if self.check_token(&[TokenId::Directive])? {
            return Err(self.unexpected(
                "while parsing a document end",
                start,
                "expected '<document end>' before directives",
                "found",
            ));
        }
        // After `...` a bare document may follow; otherwise `---` is required.
        self.state = if explicit {
            Production::ImplicitDocumentStart
        } else {
            Production::DocumentStart
        };
        debug!(explicit, "document end");
        Ok(Event::new(EventKind::DocumentEnd { explicit }, start, end))
    }

    fn parse_document_content(&mut self) -> Result<Event> {
        if self.check_token(&[
            TokenId::Directive,
            TokenId::DocumentStart,
            TokenId::DocumentEnd,
            TokenId::StreamEnd,
        ])? {
            let mark = self.peek_token()?.start().cloned();
            self.pop_state();
            return Ok(Self::empty_scalar(mark));
        }
        self.parse_node(true, false)
    }

    /// Read the directives of one document; handles start fresh for every document.
    fn process_directives(
        &mut self,
    ) -> Result<(Option<SpecVersion>, IndexMap<String, String>)> {
        let mut version: Option<SpecVersion> = None;
        let mut tags: IndexMap<String, String> = IndexMap::new();
        while self.check_token(&[TokenId::Directive])? {
            let token = self.next_token()?;
            let (kind, start, _) = token.into_parts();
            match kind {
                TokenKind::Directive(Directive::Yaml(requested)) => {
                    if version.is_some() {
                        return Err(YamlError::parser(
                            None,
                            None,
                            "found duplicate YAML directive",
                            start,
                        ));
                    }
                    let accepted = (self.version_check)(requested).map_err(|problem| {
                        YamlError::Version(MarkedError::new(None, None, problem, start.clone()))
                    })?;
                    debug!(%requested, %accepted, "YAML directive");
                    version = Some(accepted);
                }
                TokenKind::Directive(Directive::Tag { handle, prefix }) => {
                    if tags.contains_key(&handle) {
                        return Err(YamlError::parser(
                            None,
                            None,
                            format!("duplicate tag handle {}", handle),
                            start,
                        ));
                    }
                    debug!(%handle, %prefix, "TAG directive");
                    tags.insert(handle, prefix);
                }
                _ => {}
            }
        }
        let mut handles = tags.clone();
        for (handle, prefix) in default_tag_handles() {
            handles.entry(handle).or_insert(prefix);
        }
        self.tag_handles = handles;
        Ok((version, tags))
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> Result<Event> {
        if self.check_token(&[TokenId::Alias])? {
            let token = self.next_token()?;
            let (kind, start, end) = token.into_parts();
            self.pop_state();
            if let TokenKind::Alias(anchor) = kind {
                return Ok(Event::new(EventKind::Alias(anchor), start, end));
            }
        }

        let mut anchor: Option<Anchor> = None;
        let mut tag: Option<(Option<String>, String)> = None;
        let mut start: Option<Mark> = None;
        let mut end: Option<Mark> = None;
        let mut tag_mark: Option<Mark> = None;
        if self.check_token(&[TokenId::Anchor])? {
            let (kind, token_start, token_end) = self.next_token()?.into_parts();
            start = token_start;
            end = token_end;
            if let TokenKind::Anchor(name) = kind {
                anchor = Some(name);
            }
            if self.check_token(&[TokenId::Tag])? {
                let (kind, token_start, token_end) = self.next_token()?.into_parts();
                tag_mark = token_start;
                end = token_end;
                if let TokenKind::Tag { handle, suffix } = kind {
                    tag = Some((handle, suffix));
                }
            }
        } else if self.check_token(&[TokenId::Tag])? {
            let (kind, token_start, token_end) = self.next_token()?.into_parts();
            start = token_start.clone();
            tag_mark = token_start;
            end = token_end;
            if let TokenKind::Tag { handle, suffix } = kind {
                tag = Some((handle, suffix));
            }
            if self.check_token(&[TokenId::Anchor])? {
                let (kind, _, token_end) = self.next_token()?.into_parts();
                end = token_end;
                if let TokenKind::Anchor(name) = kind {
                    anchor = Some(name);
                }
            }
        }

        let tag = match tag {
            None => None,
            Some((None, suffix)) => Some(suffix),
            Some((Some(handle), suffix)) => match self.tag_handles.get(&handle) {
                Some(prefix) => Some(format!("{}{}", prefix, suffix)),
                None => {
                    return Err(YamlError::parser(
                        Some("while parsing a node"),
                        start,
                        format!("found undefined tag handle {}", handle),
                        tag_mark,
                    ))
                }
            },
        };

        if start.is_none() {
            start = self.peek_token()?.start().cloned();
            end = start.clone();
        }
        let implicit = tag.as_deref().map_or(true, |t| t == "!");

        if indentless_sequence && self.check_token(&[TokenId::BlockEntry])? {
            let end = self.peek_token()?.end().cloned();
            self.state = Production::IndentlessSequenceEntry;
            return Ok(Event::new(
                EventKind::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    flow_style: FlowStyle::Block,
                },
                start,
                end,
            ));
        }

        if self.check_token(&[TokenId::Scalar])? {
            let (kind, _, token_end) = self.next_token()?.into_parts();
            self.pop_state();
            if let TokenKind::Scalar {
                value,
                plain,
                style,
            } = kind
            {
                let implicit = if (plain && tag.is_none()) || tag.as_deref() == Some("!") {
                    ImplicitTuple::new(true, false)
                } else if tag.is_none() {
                    ImplicitTuple::new(false, true)
                } else {
                    ImplicitTuple::new(false, false)
                };
                return Ok(Event::new(
                    EventKind::Scalar {
                        anchor,
                        tag,
                        implicit,
                        value,
                        style,
                    },
                    start,
                    token_end,
                ));
            }
        }

        let collection = if self.check_token(&[TokenId::FlowSequenceStart])? {
            Some((true, FlowStyle::Flow, Production::FlowSequenceFirstEntry))
        } else if self.check_token(&[TokenId::FlowMappingStart])? {
            Some((false, FlowStyle::Flow, Production::FlowMappingFirstKey))
        } else if block && self.check_token(&[TokenId::BlockSequenceStart])? {
            Some((true, FlowStyle::Block, Production::BlockSequenceFirstEntry))
        } else if block && self.check_token(&[TokenId::BlockMappingStart])? {
            Some((false, FlowStyle::Block, Production::BlockMappingFirstKey))
        } else {
            None
        };
        if let Some((sequence, flow_style, next)) = collection {
            let token = self.peek_token()?;
            let end = if flow_style == FlowStyle::Flow {
                token.end().cloned()
            } else {
                token.start().cloned()
            };
            self.state = next;
            let kind = if sequence {
                EventKind::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    flow_style,
                }
            } else {
                EventKind::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    flow_style,
                }
            };
            return Ok(Event::new(kind, start, end));
        }

        if anchor.is_some() || tag.is_some() {
            // Properties without content: an empty scalar.
            self.pop_state();
            return Ok(Event::new(
                EventKind::Scalar {
                    anchor,
                    tag,
                    implicit: ImplicitTuple::new(implicit, false),
                    value: String::new(),
                    style: ScalarStyle::Plain,
                },
                start,
                end,
            ));
        }

        let context = if block {
            "while parsing a block node"
        } else {
            "while parsing a flow node"
        };
        Err(self.unexpected(context, start, "expected the node content", "found"))
    }

    // ========================================================================
    // Block collections
    // ========================================================================

    fn parse_block_sequence_first_entry(&mut self) -> Result<Event> {
        let token = self.next_token()?;
        self.marks.push(token.start().cloned());
        self.parse_block_sequence_entry()
    }

    fn parse_block_sequence_entry(&mut self) -> Result<Event> {
        if self.check_token(&[TokenId::BlockEntry])? {
            let token = self.next_token()?;
            if !self.check_token(&[TokenId::BlockEntry, TokenId::BlockEnd])? {
                self.states.push(Production::BlockSequenceEntry);
                return self.parse_node(true, false);
            }
            self.state = Production::BlockSequenceEntry;
            return Ok(Self::empty_scalar(token.end().cloned()));
        }
        if !self.check_token(&[TokenId::BlockEnd])? {
            let context_mark = self.marks.last().cloned().flatten();
            return Err(self.unexpected(
                "while parsing a block collection",
                context_mark,
                "expected <block end>",
                "found",
            ));
        }
        let (_, start, end) = self.next_token()?.into_parts();
        self.pop_state();
        self.marks.pop();
        Ok(Event::new(EventKind::SequenceEnd, start, end))
    }

    fn parse_indentless_sequence_entry(&mut self) -> Result<Event> {
        if self.check_token(&[TokenId::BlockEntry])? {
            let token = self.next_token()?;
            if !self.check_token(&[
                TokenId::BlockEntry,
                TokenId::Key,
                TokenId::Value,
                TokenId::BlockEnd,
            ])? {
                self.states.push(Production::IndentlessSequenceEntry);
                return self.parse_node(true, false);
            }
            self.state = Production::IndentlessSequenceEntry;
            return Ok(Self::empty_scalar(token.end().cloned()));
        }
        let mark = self.peek_token()?.start().cloned();
        self.pop_state();
        Ok(Event::new(EventKind::SequenceEnd, mark.clone(), mark))
    }

    fn parse_block_mapping_first_key(&mut self) -> Result<Event> {
        let token = self.next_token()?;
        self.marks.push(token.start().cloned());
        self.parse_block_mapping_key()
    }

    fn parse_block_mapping_key(&mut self) -> Result<Event> {
        if self.check_token(&[TokenId::Key])? {
            let token = self.next_token()?;
            if !self.check_token(&[TokenId::Key, TokenId::Value, TokenId::BlockEnd])? {
                self.states.push(Production::BlockMappingValue);
                return self.parse_node(true, true);
            }
            self.state = Production::BlockMappingValue;
            return Ok(Self::empty_scalar(token.end().cloned()));
        }
        if !self.check_token(&[TokenId::BlockEnd])? {
            let context_mark = self.marks.last().cloned().flatten();
            return Err(self.unexpected(
                "while parsing a block mapping",
                context_mark,
                "expected <block end>",
                "found",
            ));
        }
        let (_, start, end) = self.next_token()?.into_parts();
        self.pop_state();
        self.marks.pop();
        Ok(Event::new(EventKind::MappingEnd, start, end))
    }

    fn parse_block_mapping_value(&mut self) -> Result<Event> {
        if self.check_token(&[TokenId::Value])? {
            let token = self.next_token()?;
            if !self.check_token(&[TokenId::Key, TokenId::Value, TokenId::BlockEnd])? {
                self.states.push(Production::BlockMappingKey);
                return self.parse_node(true, true);
            }
            self.state = Production::BlockMappingKey;
            return Ok(Self::empty_scalar(token.end().cloned()));
        }
        self.state = Production::BlockMappingKey;
        let mark = self.peek_token()?.start().cloned();
        Ok(Self::empty_scalar(mark))
    }

    // ========================================================================
    // Flow collections
    // ========================================================================

    fn parse_flow_sequence_first_entry(&mut self) -> Result<Event> {
        let token = self.next_token()?;
        self.marks.push(token.start().cloned());
        self.parse_flow_sequence_entry(true)
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> Result<Event> {
        if !self.check_token(&[TokenId::FlowSequenceEnd])? {
            if !first {
                if self.check_token(&[TokenId::FlowEntry])? {
                    self.next_token()?;
                } else {
                    let context_mark = self.marks.last().cloned().flatten();
                    return Err(self.unexpected(
                        "while parsing a flow sequence",
                        context_mark,
                        "expected ',' or ']'",
                        "got",
                    ));
                }
            }
            if self.check_token(&[TokenId::Key])? {
                let token = self.peek_token()?;
                let start = token.start().cloned();
                let end = token.end().cloned();
                self.state = Production::FlowSequenceEntryMappingKey;
                return Ok(Event::new(
                    EventKind::MappingStart {
                        anchor: None,
                        tag: None,
                        implicit: true,
                        flow_style: FlowStyle::Flow,
                    },
                    start,
                    end,
                ));
            }
            if !self.check_token(&[TokenId::FlowSequenceEnd])? {
                self.states.push(Production::FlowSequenceEntry);
                return self.parse_node(false, false);
            }
        }
        let (_, start, end) = self.next_token()?.into_parts();
        self.pop_state();
        self.marks.pop();
        Ok(Event::new(EventKind::SequenceEnd, start, end))
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> Result<Event> {
        let token = self.next_token()?;
        if !self.check_token(&[
            TokenId::Value,
            TokenId::FlowEntry,
            TokenId::FlowSequenceEnd,
        ])? {
            self.states.push(Production::FlowSequenceEntryMappingValue);
            return self.parse_node(false, false);
        }
        self.state = Production::FlowSequenceEntryMappingValue;
        Ok(Self::empty_scalar(token.end().cloned()))
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> Result<Event> {
        if self.check_token(&[TokenId::Value])? {
            let token = self.next_token()?;
            if !self.check_token(&[TokenId::FlowEntry, TokenId::FlowSequenceEnd])? {
                self.states.push(Production::FlowSequenceEntryMappingEnd);
                return self.parse_node(false, false);
            }
            self.state = Production::FlowSequenceEntryMappingEnd;
            return Ok(Self::empty_scalar(token.end().cloned()));
        }
        self.state = Production::FlowSequenceEntryMappingEnd;
        let mark = self.peek_token()?.start().cloned();
        Ok(Self::empty_scalar(mark))
    }

    fn parse_flow_sequence_entry_mapping_end(&mut self) -> Result<Event> {
        self.state = Production::FlowSequenceEntry;
        let mark = self.peek_token()?.start().cloned();
        Ok(Event::new(EventKind::MappingEnd, mark.clone(), mark))
    }

    fn parse_flow_mapping_first_key(&mut self) -> Result<Event> {
        let token = self.next_token()?;
        self.marks.push(token.start().cloned());
        self.parse_flow_mapping_key(true)
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> Result<Event> {
        if !self.check_token(&[TokenId::FlowMappingEnd])? {
            if !first {
                if self.check_token(&[TokenId::FlowEntry])? {
                    self.next_token()?;
                } else {
                    let context_mark = self.marks.last().cloned().flatten();
                    return Err(self.unexpected(
                        "while parsing a flow mapping",
                        context_mark,
                        "expected ',' or '}'",
                        "got",
                    ));
                }
            }
            if self.check_token(&[TokenId::Key])? {
                let token = self.next_token()?;
                if !self.check_token(&[
                    TokenId::Value,
                    TokenId::FlowEntry,
                    TokenId::FlowMappingEnd,
                ])? {
                    self.states.push(Production::FlowMappingValue);
                    return self.parse_node(false, false);
                }
                self.state = Production::FlowMappingValue;
                return Ok(Self::empty_scalar(token.end().cloned()));
            }
            if !self.check_token(&[TokenId::FlowMappingEnd])? {
                self.states.push(Production::FlowMappingEmptyValue);
                return self.parse_node(false, false);
            }
        }
        let (_, start, end) = self.next_token()?.into_parts();
        self.pop_state();
        self.marks.pop();
        Ok(Event::new(EventKind::MappingEnd, start, end))
    }

    fn parse_flow_mapping_value(&mut self) -> Result<Event> {
        if self.check_token(&[TokenId::Value])? {
            let token = self.next_token()?;
            if !self.check_token(&[TokenId::FlowEntry, TokenId::FlowMappingEnd])? {
                self.states.push(Production::FlowMappingKey);
                return self.parse_node(false, false);
            }
            self.state = Production::FlowMappingKey;
            return Ok(Self::empty_scalar(token.end().cloned()));
        }
        self.state = Production::FlowMappingKey;
        let mark = self.peek_token()?.start().cloned();
        Ok(Self::empty_scalar(mark))
    }

    fn parse_flow_mapping_empty_value(&mut self) -> Result<Event> {
        self.state = Production::FlowMappingKey;
        let mark = self.peek_token()?.start().cloned();
        Ok(Self::empty_scalar(mark))
    }
}

impl Iterator for Parser<'_> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_event() {
            Ok(event) => Some(Ok(event)),
            Err(YamlError::Exhausted) => None,
            Err(err) => {
                self.state = Production::End;
                self.events.clear();
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::StreamReader;
    use pretty_assertions::assert_eq;

    fn parser<'a>(text: &'a str, settings: &LoadSettings) -> Parser<'a> {
        let reader = StreamReader::new(text, settings);
        Parser::new(Scanner::new(reader, settings), settings)
    }

    fn events_with(text: &str, settings: &LoadSettings) -> Result<Vec<String>> {
        parser(text, settings)
            .map(|event| event.map(|e| e.to_string()))
            .collect()
    }

    fn events(text: &str) -> Vec<String> {
        events_with(text, &LoadSettings::default()).unwrap()
    }

    #[test]
    fn test_empty_stream() {
        assert_eq!(events(""), vec!["+STR", "-STR"]);
    }

    #[test]
    fn test_block_mapping() {
        assert_eq!(
            events("a: 1\nb: [x, 'y']\n"),
            vec![
                "+STR", "+DOC", "+MAP", "=VAL :a", "=VAL :1", "=VAL :b", "+SEQ []", "=VAL :x",
                "=VAL 'y", "-SEQ", "-MAP", "-DOC", "-STR"
            ]
        );
    }

    #[test]
    fn test_indentless_sequence() {
        assert_eq!(
            events("key:\n- a\n- b\n"),
            vec![
                "+STR", "+DOC", "+MAP", "=VAL :key", "+SEQ", "=VAL :a", "=VAL :b", "-SEQ", "-MAP",
                "-DOC", "-STR"
            ]
        );
    }

    #[test]
    fn test_flow_sequence_single_pair() {
        assert_eq!(
            events("[a: b, c]"),
            vec![
                "+STR", "+DOC", "+SEQ []", "+MAP {}", "=VAL :a", "=VAL :b", "-MAP", "=VAL :c",
                "-SEQ", "-DOC", "-STR"
            ]
        );
    }

    #[test]
    fn test_flow_mapping_empty_value() {
        assert_eq!(
            events("{a, b: c}"),
            vec![
                "+STR", "+DOC", "+MAP {}", "=VAL :a", "=VAL :", "=VAL :b", "=VAL :c", "-MAP",
                "-DOC", "-STR"
            ]
        );
    }

    #[test]
    fn test_properties() {
        assert_eq!(
            events("- &a !!str x\n- !local\n- *a\n"),
            vec![
                "+STR",
                "+DOC",
                "+SEQ",
                "=VAL &a <tag:yaml.org,2002:str> :x",
                "=VAL <!local> :",
                "=ALI *a",
                "-SEQ",
                "-DOC",
                "-STR"
            ]
        );
    }

    #[test]
    fn test_explicit_documents() {
        assert_eq!(
            events("--- a\n...\n--- b\n"),
            vec!["+STR", "+DOC ---", "=VAL :a", "-DOC ...", "+DOC ---", "=VAL :b", "-DOC", "-STR"]
        );
    }

    #[test]
    fn test_bare_document_after_end_marker() {
        assert_eq!(
            events("a\n...\nb\n"),
            vec!["+STR", "+DOC", "=VAL :a", "-DOC ...", "+DOC", "=VAL :b", "-DOC", "-STR"]
        );
    }

    #[test]
    fn test_tag_directive_expands_handle() {
        let events = events("%TAG !e! tag:example.com,2000:app/\n--- !e!foo bar\n");
        assert_eq!(events[2], "=VAL <tag:example.com,2000:app/foo> :bar");
    }

    #[test]
    fn test_tag_handles_do_not_leak_between_documents() {
        let text = "%TAG !e! tag:example.com,2000:\n--- !e!a x\n--- !e!b y\n";
        let err = events_with(text, &LoadSettings::default()).unwrap_err();
        assert!(err.to_string().contains("found undefined tag handle !e!"));
    }

    #[test]
    fn test_duplicate_yaml_directive() {
        let err = events_with("%YAML 1.2\n%YAML 1.2\n---", &LoadSettings::default()).unwrap_err();
        assert!(err.to_string().contains("found duplicate YAML directive"));
    }

    #[test]
    fn test_duplicate_tag_handle() {
        let err = events_with("%TAG !a! x:\n%TAG !a! y:\n---", &LoadSettings::default())
            .unwrap_err();
        assert!(err.to_string().contains("duplicate tag handle !a!"));
    }

    #[test]
    fn test_version_rejected() {
        let err = events_with("%YAML 2.0\n--- a", &LoadSettings::default()).unwrap_err();
        assert!(matches!(err, YamlError::Version(_)));
    }

    #[test]
    fn test_version_hook_can_rewrite() {
        let settings = LoadSettings::default().with_version_check(|_| Ok(SpecVersion::V1_1));
        let mut parser = parser("%YAML 1.2\n--- a", &settings);
        parser.next_event().unwrap();
        let document = parser.next_event().unwrap();
        assert!(matches!(
            document.kind,
            EventKind::DocumentStart {
                version: Some(SpecVersion::V1_1),
                ..
            }
        ));
    }

    #[test]
    fn test_directive_without_document_start() {
        let err = events_with("%YAML 1.2\na: 1", &LoadSettings::default()).unwrap_err();
        assert!(err
            .to_string()
            .contains("expected '<document start>', but found '<block mapping start>'"));
    }

    #[test]
    fn test_directive_after_bare_document() {
        let err = events_with("a: 1\n%YAML 1.2\n--- b\n", &LoadSettings::default()).unwrap_err();
        assert!(matches!(err, YamlError::Parser(_)));
        let marked = err.marked().unwrap();
        assert_eq!(
            marked.problem,
            "expected '<document end>' before directives, but found '<directive>'"
        );
        assert_eq!(marked.problem_mark.as_ref().map(|m| m.line), Some(1));

        let err = events_with("- a\n%TAG !e! tag:e,2000:\n---\n", &LoadSettings::default())
            .unwrap_err();
        assert!(err.to_string().contains("before directives"));

        // an explicit end marker makes the directive legal
        assert!(events_with("a: 1\n...\n%YAML 1.2\n--- b\n", &LoadSettings::default()).is_ok());
    }

    #[test]
    fn test_directive_like_line_continues_root_scalar() {
        assert_eq!(
            events("---\nscalar\n%YAML 1.2\n"),
            vec!["+STR", "+DOC ---", "=VAL :scalar %YAML 1.2", "-DOC", "-STR"]
        );
    }

    #[test]
    fn test_flow_sequence_missing_comma() {
        let err = events_with("[a, b", &LoadSettings::default()).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("while parsing a flow sequence"));
        assert!(text.contains("expected ',' or ']', but got '<stream end>'"));
    }

    #[test]
    fn test_block_mapping_bad_token() {
        let err = events_with("a: 1\n- b", &LoadSettings::default()).unwrap_err();
        assert!(err
            .to_string()
            .contains("expected <block end>, but found '-'"));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let settings = LoadSettings::default();
        let mut parser = parser("a", &settings);
        assert!(parser.check_event(&[EventId::StreamStart]).unwrap());
        assert_eq!(parser.peek_event().unwrap().map(Event::id), Some(EventId::StreamStart));
        assert_eq!(parser.next_event().unwrap().id(), EventId::StreamStart);
        assert_eq!(parser.next_event().unwrap().id(), EventId::DocumentStart);
    }

    #[test]
    fn test_exhausted_after_stream_end() {
        let settings = LoadSettings::default();
        let mut parser = parser("", &settings);
        assert_eq!(parser.next_event().unwrap().id(), EventId::StreamStart);
        assert_eq!(parser.next_event().unwrap().id(), EventId::StreamEnd);
        assert!(matches!(parser.next_event(), Err(YamlError::Exhausted)));
        assert!(!parser.check_event(&[]).unwrap());
    }

    #[test]
    fn test_comment_events() {
        let settings = LoadSettings::default().with_parse_comments(true);
        assert_eq!(
            events_with("# head\na: 1 # tail\n", &settings).unwrap(),
            vec![
                "+STR",
                "=COM block # head",
                "+DOC",
                "+MAP",
                "=VAL :a",
                "=VAL :1",
                "=COM inline # tail",
                "-MAP",
                "-DOC",
                "-STR"
            ]
        );
    }

    #[test]
    fn test_deep_nesting_does_not_recurse() {
        let depth = 2_000;
        let text = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        let count = events(&text).len();
        assert_eq!(count, 2 * depth + 4);
    }
}
