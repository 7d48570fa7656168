//! Condition tree data structures.
//!
//! - `Operand`: what can be compared (bar price, numeric literal, named indicator)
//! - `IndicatorRef`: reference to a declared indicator, optionally to one of its fields
//! - `Comparator`: threshold and crossing comparators
//! - `Condition`: a leaf predicate
//! - `ConditionGroup`: `ALL`/`ANY` node over conditions and nested groups
//!
//! `Display` renders the expression syntax accepted by
//! [`condition_parser`](crate::domain::condition_parser), so printing then
//! parsing a tree yields the same tree.

use crate::domain::condition_parser;
use crate::domain::indicator::IndicatorField;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operand keyword for the evaluated symbol's current price.
pub const PRICE_KEYWORD: &str = "price";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndicatorRef {
    pub name: String,
    /// `None` reads the kind's default field.
    pub field: Option<IndicatorField>,
}

impl IndicatorRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: None,
        }
    }

    pub fn with_field(name: impl Into<String>, field: IndicatorField) -> Self {
        Self {
            name: name.into(),
            field: Some(field),
        }
    }
}

impl fmt::Display for IndicatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field {
            Some(field) => write!(f, "{}.{}", self.name, field),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OperandRepr", into = "OperandRepr")]
pub enum Operand {
    Price,
    Constant(f64),
    Indicator(IndicatorRef),
}

impl Operand {
    pub fn indicator(name: impl Into<String>) -> Self {
        Operand::Indicator(IndicatorRef::new(name))
    }

    pub fn indicator_field(name: impl Into<String>, field: IndicatorField) -> Self {
        Operand::Indicator(IndicatorRef::with_field(name, field))
    }

    pub fn as_indicator(&self) -> Option<&IndicatorRef> {
        match self {
            Operand::Indicator(r) => Some(r),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Price => f.write_str(PRICE_KEYWORD),
            Operand::Constant(v) => write!(f, "{}", v),
            Operand::Indicator(r) => write!(f, "{}", r),
        }
    }
}

/// JSON form of an operand: a number, `"price"`, `"name"` or `"name.field"`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum OperandRepr {
    Number(f64),
    Text(String),
}

impl TryFrom<OperandRepr> for Operand {
    type Error = String;

    fn try_from(repr: OperandRepr) -> Result<Self, Self::Error> {
        match repr {
            OperandRepr::Number(v) => Ok(Operand::Constant(v)),
            OperandRepr::Text(text) => parse_operand_text(&text),
        }
    }
}

impl From<Operand> for OperandRepr {
    fn from(operand: Operand) -> Self {
        match operand {
            Operand::Constant(v) => OperandRepr::Number(v),
            other => OperandRepr::Text(other.to_string()),
        }
    }
}

fn parse_operand_text(text: &str) -> Result<Operand, String> {
    let text = text.trim();
    if text == PRICE_KEYWORD {
        return Ok(Operand::Price);
    }
    match text.split_once('.') {
        Some((name, field)) => {
            let field = field.parse::<IndicatorField>()?;
            Ok(Operand::indicator_field(name, field))
        }
        None if text.is_empty() => Err("empty operand".to_string()),
        None => Ok(Operand::indicator(text)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "crosses_above")]
    CrossesAbove,
    #[serde(rename = "crosses_below")]
    CrossesBelow,
}

impl Comparator {
    /// Crossing comparators need the previous bar's operand values.
    pub fn is_crossing(&self) -> bool {
        matches!(self, Comparator::CrossesAbove | Comparator::CrossesBelow)
    }

    /// Keyword used by the expression syntax.
    pub fn keyword(&self) -> &'static str {
        match self {
            Comparator::Gt => "GT",
            Comparator::Lt => "LT",
            Comparator::Gte => "GTE",
            Comparator::Lte => "LTE",
            Comparator::CrossesAbove => "CROSSES_ABOVE",
            Comparator::CrossesBelow => "CROSSES_BELOW",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "GT" => Some(Comparator::Gt),
            "LT" => Some(Comparator::Lt),
            "GTE" => Some(Comparator::Gte),
            "LTE" => Some(Comparator::Lte),
            "CROSSES_ABOVE" => Some(Comparator::CrossesAbove),
            "CROSSES_BELOW" => Some(Comparator::CrossesBelow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub left: Operand,
    pub comparator: Comparator,
    pub right: Operand,
}

impl Condition {
    pub fn new(left: Operand, comparator: Comparator, right: Operand) -> Self {
        Self {
            left,
            comparator,
            right,
        }
    }

    pub fn indicator_refs(&self) -> impl Iterator<Item = &IndicatorRef> {
        self.left
            .as_indicator()
            .into_iter()
            .chain(self.right.as_indicator())
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, {})",
            self.comparator.keyword(),
            self.left,
            self.right
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupLogic {
    All,
    Any,
}

impl GroupLogic {
    pub fn keyword(&self) -> &'static str {
        match self {
            GroupLogic::All => "ALL",
            GroupLogic::Any => "ANY",
        }
    }
}

/// JSON form: a condition object, an `{"all": [...]}`/`{"any": [...]}` group
/// or an expression string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConditionNode {
    Group(ConditionGroup),
    Condition(Condition),
}

impl From<Condition> for ConditionNode {
    fn from(c: Condition) -> Self {
        ConditionNode::Condition(c)
    }
}

impl From<ConditionGroup> for ConditionNode {
    fn from(g: ConditionGroup) -> Self {
        ConditionNode::Group(g)
    }
}

impl fmt::Display for ConditionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionNode::Group(g) => write!(f, "{}", g),
            ConditionNode::Condition(c) => write!(f, "{}", c),
        }
    }
}

/// `ALL` (AND) or `ANY` (OR) over child nodes.
///
/// An empty `ALL` is true and an empty `ANY` is false.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "TaggedGroup")]
pub struct ConditionGroup {
    pub logic: GroupLogic,
    pub children: Vec<ConditionNode>,
}

impl ConditionGroup {
    pub fn all(children: Vec<ConditionNode>) -> Self {
        Self {
            logic: GroupLogic::All,
            children,
        }
    }

    pub fn any(children: Vec<ConditionNode>) -> Self {
        Self {
            logic: GroupLogic::Any,
            children,
        }
    }

    /// Leaf conditions in depth-first order.
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        collect_conditions(self, &mut out);
        out
    }

    /// Every indicator reference in depth-first order, duplicates included.
    pub fn indicator_refs(&self) -> Vec<&IndicatorRef> {
        self.conditions()
            .into_iter()
            .flat_map(|c| c.indicator_refs())
            .collect()
    }

    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|child| match child {
                ConditionNode::Group(g) => g.depth(),
                ConditionNode::Condition(_) => 0,
            })
            .max()
            .unwrap_or(0)
    }
}

fn collect_conditions<'a>(group: &'a ConditionGroup, out: &mut Vec<&'a Condition>) {
    for child in &group.children {
        match child {
            ConditionNode::Condition(c) => out.push(c),
            ConditionNode::Group(g) => collect_conditions(g, out),
        }
    }
}

impl fmt::Display for ConditionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.logic.keyword())?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", child)?;
        }
        f.write_str(")")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum TaggedGroup {
    All(Vec<ConditionNode>),
    Any(Vec<ConditionNode>),
}

impl From<ConditionGroup> for TaggedGroup {
    fn from(group: ConditionGroup) -> Self {
        match group.logic {
            GroupLogic::All => TaggedGroup::All(group.children),
            GroupLogic::Any => TaggedGroup::Any(group.children),
        }
    }
}

/// Node deserialization dispatches on the JSON shape itself, so errors inside
/// a child keep their full path (`all[0].comparator`).
struct NodeVisitor {
    /// Top-level strings always become a group; nested ones may be a bare condition.
    group_only: bool,
}

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = ConditionNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a condition, an `all`/`any` group or an expression string")
    }

    fn visit_str<E: de::Error>(self, text: &str) -> Result<ConditionNode, E> {
        if self.group_only {
            condition_parser::parse(text)
                .map(ConditionNode::Group)
                .map_err(E::custom)
        } else {
            condition_parser::parse_node(text).map_err(E::custom)
        }
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ConditionNode, A::Error> {
        let mut group: Option<ConditionGroup> = None;
        let mut left: Option<Operand> = None;
        let mut comparator: Option<Comparator> = None;
        let mut right: Option<Operand> = None;

        while let Some(key) = map.next_key::<String>()? {
            let logic = match key.as_str() {
                "all" => Some(GroupLogic::All),
                "any" => Some(GroupLogic::Any),
                _ => None,
            };
            let is_condition_field = matches!(key.as_str(), "left" | "comparator" | "right");
            let has_condition_field = left.is_some() || comparator.is_some() || right.is_some();
            let mixed = match logic {
                Some(_) => group.is_some() || has_condition_field,
                None => is_condition_field && group.is_some(),
            };
            if mixed {
                return Err(de::Error::custom(format!(
                    "unexpected key `{}`: a node is either one `all`/`any` group or a condition",
                    key
                )));
            }

            match (logic, key.as_str()) {
                (Some(logic), _) => {
                    let children = map.next_value::<Vec<ConditionNode>>()?;
                    group = Some(ConditionGroup { logic, children });
                }
                (None, "left") => set_once::<_, A::Error>(&mut left, "left", map.next_value()?)?,
                (None, "comparator") => {
                    set_once::<_, A::Error>(&mut comparator, "comparator", map.next_value()?)?
                }
                (None, "right") => {
                    set_once::<_, A::Error>(&mut right, "right", map.next_value()?)?
                }
                (None, _) => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        if let Some(group) = group {
            return Ok(ConditionNode::Group(group));
        }
        if self.group_only && left.is_none() && comparator.is_none() && right.is_none() {
            return Err(de::Error::custom("expected an `all` or `any` key"));
        }
        Ok(ConditionNode::Condition(Condition {
            left: left.ok_or_else(|| de::Error::missing_field("left"))?,
            comparator: comparator.ok_or_else(|| de::Error::missing_field("comparator"))?,
            right: right.ok_or_else(|| de::Error::missing_field("right"))?,
        }))
    }
}

fn set_once<T, E: de::Error>(slot: &mut Option<T>, field: &'static str, value: T) -> Result<(), E> {
    if slot.is_some() {
        return Err(E::duplicate_field(field));
    }
    *slot = Some(value);
    Ok(())
}

impl<'de> Deserialize<'de> for ConditionNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor { group_only: false })
    }
}

impl<'de> Deserialize<'de> for ConditionGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match deserializer.deserialize_any(NodeVisitor { group_only: true })? {
            ConditionNode::Group(group) => Ok(group),
            ConditionNode::Condition(_) => Err(de::Error::custom(
                "expected an `all` or `any` group, found a bare condition",
            )),
        }
    }
}
