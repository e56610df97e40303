use crate::DocumentError;

use super::XmlElement;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Element { prefixed: bool, local: String },
    Any,
    SelfNode,
}

impl Step {
    fn matches(&self, element: &XmlElement, namespace: Option<&str>) -> bool {
        match self {
            Step::Element { prefixed: true, local } => element.local_name() == local,
            Step::Element { prefixed: false, local } => element.local_name() == local && element.namespace.as_deref() == namespace,
            Step::Any => true,
            Step::SelfNode => true,
        }
    }
}

/// A compiled XML path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct XmlPath {
    absolute: bool,
    steps: Vec<Step>,
    attribute: Option<String>,
}

/// Location of one matched element, as child-element indices from the root.
pub(crate) type ElementPosition = Vec<usize>;

impl XmlPath {
    pub(crate) fn compile(path: &str) -> Result<Self, DocumentError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(DocumentError::invalid_path(path, "path is empty"));
        }
        if trimmed.contains("//") {
            return Err(DocumentError::invalid_path(path, "descendant steps are not supported"));
        }
        if trimmed.contains('[') || trimmed.contains('(') {
            return Err(DocumentError::invalid_path(path, "predicates and functions are not supported"));
        }

        let absolute = trimmed.starts_with('/');
        let body = trimmed.trim_start_matches('/');
        let segments: Vec<&str> = body.split('/').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(DocumentError::invalid_path(path, "empty step"));
        }

        let mut steps = Vec::with_capacity(segments.len());
        let mut attribute = None;
        for (index, segment) in segments.iter().enumerate() {
            if let Some(name) = segment.strip_prefix('@') {
                if index + 1 != segments.len() {
                    return Err(DocumentError::invalid_path(path, "attribute selector must be the final step"));
                }
                if name.is_empty() {
                    return Err(DocumentError::invalid_path(path, "attribute selector has no name"));
                }
                attribute = Some(name.to_string());
                continue;
            }
            let step = match *segment {
                "*" => Step::Any,
                "." => Step::SelfNode,
                ".." => return Err(DocumentError::invalid_path(path, "parent steps are not supported")),
                name => match name.split_once(':') {
                    Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => Step::Element {
                        prefixed: true,
                        local: local.to_string(),
                    },
                    Some(_) => return Err(DocumentError::invalid_path(path, format!("malformed step '{name}'"))),
                    None => Step::Element {
                        prefixed: false,
                        local: name.to_string(),
                    },
                },
            };
            steps.push(step);
        }

        if absolute && !matches!(steps.first(), Some(Step::Element { .. } | Step::Any)) {
            return Err(DocumentError::invalid_path(path, "absolute paths must start with the root element"));
        }

        Ok(Self { absolute, steps, attribute })
    }

    pub(crate) fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Positions of every element selected by the element steps, in document order.
    pub(crate) fn select(&self, root: &XmlElement, namespace: Option<&str>) -> Vec<ElementPosition> {
        let mut steps = self.steps.iter();
        let mut context: Vec<(ElementPosition, &XmlElement)> = vec![(Vec::new(), root)];

        if self.absolute {
            match steps.next() {
                Some(step) if step.matches(root, namespace) => {}
                _ => return Vec::new(),
            }
        }

        for step in steps {
            if context.is_empty() {
                break;
            }
            if *step == Step::SelfNode {
                continue;
            }
            context = context
                .into_iter()
                .flat_map(|(position, element)| {
                    element
                        .child_elements()
                        .enumerate()
                        .filter(|(_, child)| step.matches(child, namespace))
                        .map(move |(index, child)| {
                            let mut child_position = position.clone();
                            child_position.push(index);
                            (child_position, child)
                        })
                        .collect::<Vec<_>>()
                })
                .collect();
        }

        context.into_iter().map(|(position, _)| position).collect()
    }
}
