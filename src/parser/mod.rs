//! Recursive descent parser for job files
//! Converts tokens into a `Job`

use crate::ast::*;
use crate::lexer::{self, LexError, Token};
use crate::model::{CuttingMode, FeatureType, Geometry, StockShape};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unrecognized input")]
    Lex { span: Span },

    #[error("unexpected token: expected {expected}, got {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEOF { expected: String, offset: usize },

    #[error("unknown feature type '{name}'")]
    UnknownFeature { name: String, span: Span },

    #[error("{message}")]
    WithLocation { message: String, span: Span },
}

impl ParseError {
    /// Byte range of the offending input
    pub fn span(&self) -> Span {
        match self {
            ParseError::Lex { span }
            | ParseError::UnexpectedToken { span, .. }
            | ParseError::UnknownFeature { span, .. }
            | ParseError::WithLocation { span, .. } => span.clone(),
            ParseError::UnexpectedEOF { offset, .. } => *offset..*offset,
        }
    }
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::Lex { span: e.span }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Lex and parse a whole job file
pub fn parse_job(source: &str) -> Result<Job> {
    let tokens = lexer::lex(source)?;
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: Vec<(Token, logos::Span)>,
    position: usize,
    end: usize,
}

impl Parser {
    pub fn new(tokens: Vec<(Token, logos::Span)>) -> Self {
        let end = tokens.last().map(|(_, span)| span.end).unwrap_or(0);
        Self {
            tokens,
            position: 0,
            end,
        }
    }

    /// Parse the full job: header statements in any order, then operations
    pub fn parse(&mut self) -> Result<Job> {
        let mut part = None;
        let mut stock = None;
        let mut quantities = Vec::new();

        loop {
            match self.peek() {
                Some(Token::Part) => {
                    if part.is_some() {
                        return Err(self.error("part declared twice"));
                    }
                    part = Some(self.parse_part()?);
                }
                Some(Token::Stock) => {
                    if stock.is_some() {
                        return Err(self.error("stock declared twice"));
                    }
                    stock = Some(self.parse_stock()?);
                }
                Some(Token::Quantity) => quantities.extend(self.parse_quantities()?),
                _ => break,
            }
        }

        let mut operations: Vec<OperationDecl> = Vec::new();
        while self.peek().is_some() {
            let op = self.parse_operation()?;
            if operations.iter().any(|o| o.sequence() == op.sequence()) {
                return Err(ParseError::WithLocation {
                    message: format!("operation {} declared twice", op.sequence()),
                    span: op.span().clone(),
                });
            }
            operations.push(op);
        }

        let part = part.ok_or_else(|| ParseError::WithLocation {
            message: "missing part declaration".to_string(),
            span: 0..0,
        })?;
        let stock = stock.ok_or_else(|| ParseError::WithLocation {
            message: "missing stock declaration".to_string(),
            span: part.span.clone(),
        })?;

        Ok(Job {
            part,
            stock,
            quantities,
            operations,
        })
    }

    fn parse_part(&mut self) -> Result<PartDecl> {
        let start = self.span().start;
        self.consume(Token::Part)?;
        let name = self.expect_name("part name")?;
        self.consume(Token::Material)?;
        let material = self.expect_name("material id")?;
        self.consume(Token::Category)?;
        let category = self.expect_name("price category")?;

        Ok(PartDecl {
            name,
            material,
            category,
            span: start..self.last_end(),
        })
    }

    fn parse_stock(&mut self) -> Result<StockDecl> {
        let start = self.span().start;
        self.consume(Token::Stock)?;

        let shape = match self.peek() {
            Some(Token::Bar) => {
                self.advance();
                self.consume(Token::Diameter)?;
                StockShape::Bar {
                    diameter: self.expect_number()?,
                }
            }
            Some(Token::Tube) => {
                self.advance();
                self.consume(Token::Diameter)?;
                let outer_diameter = self.expect_number()?;
                self.consume(Token::Bore)?;
                let inner_diameter = self.expect_number()?;
                StockShape::Tube {
                    outer_diameter,
                    inner_diameter,
                }
            }
            Some(Token::Billet) => {
                self.advance();
                self.consume(Token::Width)?;
                let width = self.expect_number()?;
                self.consume(Token::Height)?;
                let height = self.expect_number()?;
                StockShape::Billet { width, height }
            }
            _ => return Err(self.unexpected("'bar', 'tube' or 'billet'")),
        };

        self.consume(Token::Length)?;
        let length = self.expect_number()?;

        Ok(StockDecl {
            shape,
            length,
            span: start..self.last_end(),
        })
    }

    fn parse_quantities(&mut self) -> Result<Vec<u32>> {
        self.consume(Token::Quantity)?;
        let mut quantities = vec![self.expect_whole("quantity")?];
        while let Some(Token::Number(_)) = self.peek() {
            quantities.push(self.expect_whole("quantity")?);
        }
        Ok(quantities)
    }

    fn parse_operation(&mut self) -> Result<OperationDecl> {
        let start = self.span().start;
        self.consume(Token::Op)?;
        let sequence = self.expect_whole("operation sequence")?;

        match self.peek() {
            Some(Token::On) => {
                self.advance();
                self.parse_machining(start, sequence)
            }
            Some(Token::Coop) => {
                self.advance();
                self.parse_cooperation(start, sequence)
            }
            _ => Err(self.unexpected("'on' or 'coop'")),
        }
    }

    fn parse_machining(&mut self, start: usize, sequence: u32) -> Result<OperationDecl> {
        let work_center = self.expect_name("work center")?;
        let mut mode = None;
        let mut setup = None;
        let mut time = None;

        loop {
            match self.peek() {
                Some(Token::Mode) => {
                    if mode.is_some() {
                        return Err(self.error("mode given twice"));
                    }
                    self.advance();
                    let span = self.span();
                    let name = self.expect_name("cutting mode")?;
                    mode = Some(name.parse::<CuttingMode>().map_err(|message| {
                        ParseError::WithLocation { message, span }
                    })?);
                }
                Some(Token::Setup) => self.attribute(&mut setup, "setup")?,
                Some(Token::Time) => self.attribute(&mut time, "time")?,
                _ => break,
            }
        }
        let header_end = self.last_end();

        let mut features = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Word(_)) => features.push(self.parse_feature()?),
                Some(Token::Op) | None => break,
                _ => return Err(self.unexpected("feature or 'op'")),
            }
        }

        let end = features.last().map(|f: &FeatureDecl| f.span.end).unwrap_or(header_end);
        Ok(OperationDecl::Machining(MachiningDecl {
            sequence,
            work_center,
            mode: mode.unwrap_or_default(),
            setup,
            time,
            features,
            span: start..end,
        }))
    }

    fn parse_cooperation(&mut self, start: usize, sequence: u32) -> Result<OperationDecl> {
        let name = self.expect_name("cooperation name")?;
        self.consume(Token::Unit)?;
        let unit_price = self.expect_number()?;
        let minimum_lot_price = match self.peek() {
            Some(Token::Min) => {
                self.advance();
                self.expect_number()?
            }
            _ => 0.0,
        };

        Ok(OperationDecl::Cooperation(CooperationDecl {
            sequence,
            name,
            unit_price,
            minimum_lot_price,
            span: start..self.last_end(),
        }))
    }

    fn parse_feature(&mut self) -> Result<FeatureDecl> {
        let span = self.span();
        let name = self.expect_name("feature")?;
        let feature_type = feature_type(&name).ok_or_else(|| ParseError::UnknownFeature {
            name,
            span: span.clone(),
        })?;

        let mut geometry = Geometry::default();
        let mut count = None;
        let mut speed = None;
        let mut feed = None;
        let mut depth_of_cut = None;

        loop {
            match self.peek() {
                Some(Token::From) => self.attribute(&mut geometry.from_diameter, "from")?,
                Some(Token::To) => self.attribute(&mut geometry.to_diameter, "to")?,
                Some(Token::Diameter) => self.attribute(&mut geometry.to_diameter, "dia")?,
                Some(Token::Length) => self.attribute(&mut geometry.length, "length")?,
                Some(Token::Depth) => self.attribute(&mut geometry.depth, "depth")?,
                Some(Token::Width) => self.attribute(&mut geometry.width, "width")?,
                Some(Token::Corner) => self.attribute(&mut geometry.corner_radius, "corner")?,
                Some(Token::Pitch) => self.attribute(&mut geometry.pitch, "pitch")?,
                Some(Token::Speed) => self.attribute(&mut speed, "speed")?,
                Some(Token::Feed) => self.attribute(&mut feed, "feed")?,
                Some(Token::Doc) => self.attribute(&mut depth_of_cut, "doc")?,
                Some(Token::Size) => {
                    if geometry.pocket_length.is_some() {
                        return Err(self.error("size given twice"));
                    }
                    self.advance();
                    geometry.pocket_length = Some(self.expect_number()?);
                    geometry.pocket_width = Some(self.expect_number()?);
                }
                Some(Token::Count) => {
                    if count.is_some() {
                        return Err(self.error("count given twice"));
                    }
                    self.advance();
                    count = Some(self.expect_whole("count")?);
                }
                _ => break,
            }
        }
        if let Some(count) = count {
            geometry.count = count;
        }

        Ok(FeatureDecl {
            feature_type,
            geometry,
            speed,
            feed,
            depth_of_cut,
            span: span.start..self.last_end(),
        })
    }

    // Helper methods
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<&Token> {
        if let Some((_, _)) = self.tokens.get(self.position) {
            self.position += 1;
        }
        self.tokens.get(self.position - 1).map(|(t, _)| t)
    }

    /// Span of the current token, or an empty span at end of input
    fn span(&self) -> Span {
        self.tokens
            .get(self.position)
            .map(|(_, span)| span.clone())
            .unwrap_or(self.end..self.end)
    }

    fn last_end(&self) -> usize {
        self.position
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, span)| span.end)
            .unwrap_or(0)
    }

    fn consume(&mut self, expected: Token) -> Result<()> {
        match self.peek() {
            Some(token) if token == &expected => {
                self.advance();
                Ok(())
            }
            _ => Err(self.unexpected(&expected.to_string())),
        }
    }

    fn expect_number(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Number(n)) => {
                let val = *n;
                self.advance();
                Ok(val)
            }
            _ => Err(self.unexpected("number")),
        }
    }

    /// Non-negative integer, e.g. a quantity or sequence number
    fn expect_whole(&mut self, what: &str) -> Result<u32> {
        let span = self.span();
        let n = self.expect_number()?;
        if n < 0.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
            return Err(ParseError::WithLocation {
                message: format!("{} must be a whole number, got {}", what, n),
                span,
            });
        }
        Ok(n as u32)
    }

    /// Identifier or quoted string. Ids that lex as numbers (e.g. 1.4301) must be quoted.
    fn expect_name(&mut self, what: &str) -> Result<String> {
        match self.peek() {
            Some(Token::Word(s)) | Some(Token::String(s)) => {
                let val = s.clone();
                self.advance();
                Ok(val)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// `keyword NUMBER`, rejected when the slot is already filled
    fn attribute(&mut self, slot: &mut Option<f64>, name: &str) -> Result<()> {
        if slot.is_some() {
            return Err(self.error(&format!("{} given twice", name)));
        }
        self.advance();
        *slot = Some(self.expect_number()?);
        Ok(())
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                got: token.to_string(),
                span: self.span(),
            },
            None => ParseError::UnexpectedEOF {
                expected: expected.to_string(),
                offset: self.end,
            },
        }
    }

    fn error(&self, msg: &str) -> ParseError {
        ParseError::WithLocation {
            message: msg.to_string(),
            span: self.span(),
        }
    }
}

/// Feature keyword, full name or short alias
fn feature_type(name: &str) -> Option<FeatureType> {
    let lower = name.to_lowercase();
    let canonical = match lower.as_str() {
        "face" => "facing",
        "groove" => "grooving",
        "drill" => "drilling",
        "deep_drill" => "deep_drilling",
        "thread_ext" => "thread_external",
        "thread_int" => "thread_internal",
        "pocket" => "pocket_milling",
        "contour" => "contour_milling",
        "deburr" => "deburring",
        "wash" => "washing",
        "inspect" => "inspection",
        "pack" => "packing",
        "hone" => "honing",
        "polish" => "polishing",
        "chamfer" => "chamfer_touch_up",
        "radius" => "radius_touch_up",
        other => other,
    };
    canonical.parse().ok()
}
