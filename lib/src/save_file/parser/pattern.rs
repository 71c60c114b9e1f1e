use std::{fmt, str::FromStr};

use super::{error::PatternError, tree::ElementRef, types::NodeId};

/// The direction a [Step] moves in, relative to the current element set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    /// `tag`, direct children
    Child,
    /// `//tag`, every element beneath
    Descendant,
    /// `..`
    Parent,
    /// `.`
    Current,
}

/// A condition an element has to fulfill, written in square brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    /// `[@attr]`
    HasAttribute(String),
    /// `[@attr='value']`
    AttributeEquals(String, String),
    /// `[tag]`
    HasChild(String),
    /// `[tag='text']`
    ChildTextEquals(String, String),
    /// `[n]`, one based position among the siblings with the same tag
    Position(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    /// None is the `*` wildcard
    tag: Option<String>,
    predicates: Vec<Predicate>,
}

/// A compiled ElementPath style search pattern, like `.//li[@Class='Tale_SinglePawn']`.
///
/// Only the subset needed to address the save format is supported:
/// `.`, `..`, `tag`, `*`, `/`, `//` and the predicates `[@attr]`,
/// `[@attr='value']`, `[tag]`, `[tag='text']` and `[n]`.
/// Patterns are always relative to the element they are evaluated on.
///
/// `[n]` counts among all siblings with the same tag, so in
/// `li[@Class='S'][2]` the second `li` has to carry the attribute, not the
/// second `li` carrying it. `[tag='text']` compares the concatenated text of
/// the child and its descendants. Text following a nested element is not kept
/// by [XmlTree](super::XmlTree), so it takes no part in the comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPattern {
    source: String,
    steps: Vec<Step>,
}

/// Removes a pair of matching quotes around the value, if present
fn unquote(value: &str) -> Option<&str> {
    let value = value.trim();
    for quote in ['\'', '"'] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return Some(inner);
        }
    }
    None
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

fn parse_predicate(pattern: &str, body: &str) -> Result<Predicate, PatternError> {
    let invalid = || PatternError::InvalidPredicate {
        pattern: pattern.to_owned(),
        predicate: body.to_owned(),
    };
    let body = body.trim();
    if let Ok(position) = body.parse::<usize>() {
        if position == 0 {
            return Err(invalid());
        }
        return Ok(Predicate::Position(position));
    }
    let (name, value) = match body.split_once('=') {
        Some((name, value)) => (name.trim(), Some(unquote(value).ok_or_else(invalid)?)),
        None => (body, None),
    };
    if let Some(attribute) = name.strip_prefix('@') {
        if !is_valid_name(attribute) {
            return Err(invalid());
        }
        Ok(match value {
            Some(value) => Predicate::AttributeEquals(attribute.to_owned(), value.to_owned()),
            None => Predicate::HasAttribute(attribute.to_owned()),
        })
    } else {
        if !is_valid_name(name) {
            return Err(invalid());
        }
        Ok(match value {
            Some(value) => Predicate::ChildTextEquals(name.to_owned(), value.to_owned()),
            None => Predicate::HasChild(name.to_owned()),
        })
    }
}

fn parse_step(pattern: &str, token: &str, axis: Axis) -> Result<Step, PatternError> {
    let invalid = || PatternError::InvalidStep {
        pattern: pattern.to_owned(),
        step: token.to_owned(),
    };
    match token {
        "." if axis == Axis::Child => {
            return Ok(Step {
                axis: Axis::Current,
                tag: None,
                predicates: Vec::new(),
            })
        }
        ".." if axis == Axis::Child => {
            return Ok(Step {
                axis: Axis::Parent,
                tag: None,
                predicates: Vec::new(),
            })
        }
        "." | ".." => return Err(invalid()),
        _ => {}
    }
    let (name, mut rest) = match token.find('[') {
        Some(index) => token.split_at(index),
        None => (token, ""),
    };
    let tag = match name {
        "*" => None,
        name if is_valid_name(name) => Some(name.to_owned()),
        _ => return Err(invalid()),
    };
    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let body = rest.strip_prefix('[').ok_or_else(invalid)?;
        let end = body.find(']').ok_or_else(invalid)?;
        predicates.push(parse_predicate(pattern, &body[..end])?);
        rest = &body[end + 1..];
    }
    Ok(Step {
        axis,
        tag,
        predicates,
    })
}

/// Splits the pattern on the slashes that are not within a predicate
fn split_steps(pattern: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, c) in pattern.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                tokens.push(&pattern[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    tokens.push(&pattern[start..]);
    tokens
}

impl SearchPattern {
    /// Compile a pattern
    pub fn new<S: AsRef<str>>(pattern: S) -> Result<Self, PatternError> {
        let pattern = pattern.as_ref().trim();
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }
        if pattern.starts_with('/') {
            return Err(PatternError::Absolute(pattern.to_owned()));
        }
        let mut steps = Vec::new();
        let mut descendant = false;
        for token in split_steps(pattern) {
            if token.is_empty() {
                if descendant {
                    return Err(PatternError::InvalidStep {
                        pattern: pattern.to_owned(),
                        step: "///".to_owned(),
                    });
                }
                descendant = true;
                continue;
            }
            let axis = if descendant {
                Axis::Descendant
            } else {
                Axis::Child
            };
            descendant = false;
            steps.push(parse_step(pattern, token.trim(), axis)?);
        }
        if descendant {
            return Err(PatternError::InvalidStep {
                pattern: pattern.to_owned(),
                step: String::new(),
            });
        }
        Ok(SearchPattern {
            source: pattern.to_owned(),
            steps,
        })
    }

    /// The pattern as it was written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluates the pattern with `context` as the current element.
    /// The result is in document order and contains no duplicates.
    pub(crate) fn select(&self, context: ElementRef<'_>) -> Vec<NodeId> {
        let tree = context.tree();
        let mut current = vec![context.id()];
        for step in &self.steps {
            let mut next = Vec::new();
            for &id in &current {
                let element = tree.element(id);
                match step.axis {
                    Axis::Current => next.push(id),
                    Axis::Parent => {
                        if let Some(parent) = element.parent() {
                            next.push(parent.id());
                        }
                    }
                    Axis::Child => {
                        next.extend(
                            element
                                .children()
                                .filter(|child| step.matches(*child))
                                .map(|child| child.id()),
                        );
                    }
                    Axis::Descendant => {
                        let mut stack: Vec<ElementRef> = element.children().rev().collect();
                        while let Some(node) = stack.pop() {
                            if step.matches(node) {
                                next.push(node.id());
                            }
                            stack.extend(node.children().rev());
                        }
                    }
                }
            }
            next.sort_unstable();
            next.dedup();
            current = next;
            if current.is_empty() {
                break;
            }
        }
        current
    }
}

impl Step {
    fn matches_tag(&self, element: ElementRef<'_>) -> bool {
        match &self.tag {
            Some(tag) => element.tag() == tag,
            None => true,
        }
    }

    /// The predicates filter one after another, so the element has to pass
    /// all of them.
    fn matches(&self, element: ElementRef<'_>) -> bool {
        self.matches_tag(element)
            && self
                .predicates
                .iter()
                .all(|predicate| predicate.matches(element))
    }
}

impl Predicate {
    fn matches(&self, element: ElementRef<'_>) -> bool {
        match self {
            Predicate::HasAttribute(name) => element.attribute(name).is_some(),
            Predicate::AttributeEquals(name, value) => {
                element.attribute(name) == Some(value.as_str())
            }
            Predicate::HasChild(tag) => element.children().any(|c| c.tag() == tag),
            Predicate::ChildTextEquals(tag, value) => element
                .children()
                .any(|c| c.tag() == tag && full_text(c) == *value),
            Predicate::Position(position) => {
                // counted among the siblings sharing the tag, regardless of other predicates
                let Some(parent) = element.parent() else {
                    return false;
                };
                parent
                    .children()
                    .filter(|sibling| sibling.tag() == element.tag())
                    .nth(position - 1)
                    .is_some_and(|sibling| sibling.id() == element.id())
            }
        }
    }
}

/// The text of the element followed by the text of its descendants, in
/// document order
fn full_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    let mut stack = vec![element];
    while let Some(node) = stack.pop() {
        if let Some(own) = node.text() {
            text.push_str(own);
        }
        stack.extend(node.children().rev());
    }
    text
}

impl FromStr for SearchPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchPattern::new(s)
    }
}

impl fmt::Display for SearchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::super::XmlTree;
    use super::*;

    const DOC: &str = r#"
    <savegame>
        <meta><gameVersion>1.4</gameVersion></meta>
        <game>
            <tales>
                <li Class="Tale_SinglePawn"><date>1</date></li>
                <li Class="Tale_DoublePawn"><date>2</date></li>
                <li Class="Tale_SinglePawn"><date>3</date></li>
            </tales>
            <things>
                <thing Class="Plant"><def>Plant_Grass</def></thing>
                <thing Class="Pawn"><def>Human</def></thing>
            </things>
        </game>
    </savegame>
    "#;

    fn texts(tree: &XmlTree, pattern: &str) -> Vec<String> {
        tree.root()
            .find_all(&SearchPattern::new(pattern).unwrap())
            .iter()
            .map(|e| e.text().unwrap_or_default().to_owned())
            .collect()
    }

    #[test]
    fn test_child_path() {
        let tree = XmlTree::parse_str(DOC).unwrap();
        assert_eq!(texts(&tree, "./meta/gameVersion"), vec!["1.4"]);
        assert_eq!(texts(&tree, "meta/gameVersion"), vec!["1.4"]);
        assert!(texts(&tree, "./gameVersion").is_empty());
    }

    #[test]
    fn test_descendant_attribute() {
        let tree = XmlTree::parse_str(DOC).unwrap();
        assert_eq!(
            texts(&tree, ".//li[@Class='Tale_SinglePawn']/date"),
            vec!["1", "3"]
        );
        assert_eq!(texts(&tree, ".//li[@Class]/date"), vec!["1", "2", "3"]);
        assert_eq!(
            texts(&tree, ".//thing[@Class=\"Plant\"]/def"),
            vec!["Plant_Grass"]
        );
    }

    #[test]
    fn test_parent_and_wildcard() {
        let tree = XmlTree::parse_str(DOC).unwrap();
        let pattern = SearchPattern::new(".//date/..").unwrap();
        assert_eq!(tree.root().find_all(&pattern).len(), 3);
        let pattern = SearchPattern::new("./*").unwrap();
        let tags: Vec<_> = tree
            .root()
            .find_all(&pattern)
            .iter()
            .map(|e| e.tag().to_owned())
            .collect();
        assert_eq!(tags, vec!["meta", "game"]);
    }

    #[test]
    fn test_child_predicates() {
        let tree = XmlTree::parse_str(DOC).unwrap();
        assert_eq!(texts(&tree, ".//thing[def='Human']/def"), vec!["Human"]);
        assert_eq!(texts(&tree, ".//tales/li[2]/date"), vec!["2"]);
        assert!(texts(&tree, ".//li[@Class='Tale_SinglePawn'][2]/date").is_empty());
        assert_eq!(texts(&tree, ".//li[@Class='Tale_SinglePawn'][3]/date"), vec!["3"]);
        assert_eq!(tree.root().find_all(&SearchPattern::new(".//li[date]").unwrap()).len(), 3);
    }

    #[test]
    fn test_position_among_same_tag() {
        let tree = XmlTree::parse_str(
            r#"<tales>
                <li Class="S"><date>1</date></li>
                <li Class="D"><date>2</date></li>
                <note>skipped</note>
                <li Class="S"><date>3</date></li>
            </tales>"#,
        )
        .unwrap();
        assert!(texts(&tree, ".//li[@Class='S'][2]/date").is_empty());
        assert_eq!(texts(&tree, ".//li[3][@Class='S']/date"), vec!["3"]);
        assert!(texts(&tree, ".//li[2][@Class='S']/date").is_empty());
        assert_eq!(texts(&tree, "./li[2]/date"), vec!["2"]);
        assert_eq!(texts(&tree, "./*[3]/date"), vec!["3"]);
        assert_eq!(texts(&tree, "./*[1]"), vec!["", "skipped"]);
    }

    #[test]
    fn test_child_text_spans_descendants() {
        let tree = XmlTree::parse_str(
            "<things><thing><label>Corn<b>field</b></label></thing><thing><label>Corn</label></thing></things>",
        )
        .unwrap();
        let pattern = SearchPattern::new("./thing[label='Cornfield']").unwrap();
        let found = tree.root().find_all(&pattern);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), tree.root().children().next().unwrap().id());
        assert_eq!(
            tree.root()
                .find_all(&SearchPattern::new("./thing[label='Corn']").unwrap())
                .len(),
            1
        );
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(SearchPattern::new(""), Err(PatternError::Empty)));
        assert!(matches!(
            SearchPattern::new("/savegame"),
            Err(PatternError::Absolute(_))
        ));
        assert!(matches!(
            SearchPattern::new(".//li["),
            Err(PatternError::InvalidStep { .. })
        ));
        assert!(matches!(
            SearchPattern::new(".//li[@Class=Plant]"),
            Err(PatternError::InvalidPredicate { .. })
        ));
        assert!(matches!(
            SearchPattern::new(".//"),
            Err(PatternError::InvalidStep { .. })
        ));
        assert!(SearchPattern::new(".//li[0]").is_err());
    }

    #[test]
    fn test_display() {
        let pattern: SearchPattern = ".//weatherManager".parse().unwrap();
        assert_eq!(pattern.to_string(), ".//weatherManager");
    }
}
