//! In-memory session store.
//!
//! Each upload gets a session id (UUID v4) that moves through
//! `Processing → Ready(SlideData)` or `Processing → Failed(detail)`.
//! The store is a cheap `Clone` handle over an `Arc<RwLock<HashMap>>`; locks
//! are never held across an `.await`.
//!
//! With fixtures enabled, an unknown id reads as the built-in "Introduction
//! to Computer Science" deck, so clients can exercise every endpoint without
//! uploading anything. Reads never store the fixture; the first edit or
//! regeneration stores a copy under that id. Ids that start with `invalid`
//! are always reported as not found.

use crate::error::LecSlideError;
use crate::model::{Concept, FlowEdge, FlowNode, Flowchart, Question, Slide, SlideData, VisualAid};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Processing,
    Ready(SlideData),
    Failed(String),
}

/// Shared handle to every live session.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionState>>>,
    fixtures: bool,
}

impl SessionStore {
    pub fn new(fixtures: bool) -> Self {
        Self {
            sessions: Arc::default(),
            fixtures,
        }
    }

    /// Register a new session in `Processing` and return its id.
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.write().insert(id.clone(), SessionState::Processing);
        debug!("Session {} created", id);
        id
    }

    /// Insert or overwrite a session.
    pub fn insert(&self, id: impl Into<String>, state: SessionState) {
        self.sessions.write().insert(id.into(), state);
    }

    pub fn set_ready(&self, id: &str, data: SlideData) {
        self.insert(id, SessionState::Ready(data));
    }

    pub fn set_failed(&self, id: &str, detail: impl Into<String>) {
        self.insert(id, SessionState::Failed(detail.into()));
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current state of a session.
    pub fn state(&self, id: &str) -> Result<SessionState, LecSlideError> {
        if id.starts_with("invalid") {
            return Err(LecSlideError::session_not_found(id));
        }
        if let Some(state) = self.sessions.read().get(id) {
            return Ok(state.clone());
        }
        if !self.fixtures {
            return Err(LecSlideError::session_not_found(id));
        }

        debug!("Session {} unknown, serving the demo deck", id);
        Ok(SessionState::Ready(demo_deck()))
    }

    /// The finished deck of a session.
    pub fn slide_data(&self, id: &str) -> Result<SlideData, LecSlideError> {
        match self.state(id)? {
            SessionState::Ready(data) => Ok(data),
            SessionState::Processing => Err(LecSlideError::SessionProcessing {
                session_id: id.to_string(),
            }),
            SessionState::Failed(detail) => Err(LecSlideError::SessionFailed {
                session_id: id.to_string(),
                detail,
            }),
        }
    }

    /// One slide of a finished deck.
    pub fn slide(&self, session_id: &str, slide_id: u32) -> Result<Slide, LecSlideError> {
        self.slide_data(session_id)?
            .slide(slide_id)
            .cloned()
            .ok_or_else(|| LecSlideError::slide_not_found(slide_id))
    }

    /// Mutate one slide in place and return its new value.
    ///
    /// `update` runs under the write lock; when it fails the slide is left
    /// as it was.
    pub fn update_slide<F>(&self, session_id: &str, slide_id: u32, update: F) -> Result<Slide, LecSlideError>
    where
        F: FnOnce(&mut Slide) -> Result<(), LecSlideError>,
    {
        // Surfaces NotFound, Processing and Failed before taking the write lock.
        self.slide_data(session_id)?;

        let mut sessions = self.sessions.write();
        if self.fixtures && !sessions.contains_key(session_id) {
            debug!("Session {} stores its own copy of the demo deck", session_id);
            sessions.insert(session_id.to_string(), SessionState::Ready(demo_deck()));
        }
        let data = match sessions.get_mut(session_id) {
            Some(SessionState::Ready(data)) => data,
            _ => return Err(LecSlideError::session_not_found(session_id)),
        };
        let slide = data
            .slide_mut(slide_id)
            .ok_or_else(|| LecSlideError::slide_not_found(slide_id))?;

        let mut draft = slide.clone();
        update(&mut draft)?;
        *slide = draft.clone();
        Ok(draft)
    }
}

/// The built-in two-slide demo deck.
pub fn demo_deck() -> SlideData {
    let chain = |steps: &[(&str, &str)]| {
        let nodes: Vec<FlowNode> = steps
            .iter()
            .map(|(id, label)| FlowNode {
                id: id.to_string(),
                label: label.to_string(),
            })
            .collect();
        let edges = steps
            .windows(2)
            .map(|w| FlowEdge {
                from: w[0].0.to_string(),
                to: w[1].0.to_string(),
            })
            .collect();
        VisualAid::Flowchart(Flowchart { nodes, edges })
    };
    let star = |hub: (&str, &str), spokes: &[(&str, &str)]| {
        let mut nodes = vec![FlowNode {
            id: hub.0.to_string(),
            label: hub.1.to_string(),
        }];
        nodes.extend(spokes.iter().map(|(id, label)| FlowNode {
            id: id.to_string(),
            label: label.to_string(),
        }));
        let edges = spokes
            .iter()
            .map(|(id, _)| FlowEdge {
                from: hub.0.to_string(),
                to: id.to_string(),
            })
            .collect();
        VisualAid::Flowchart(Flowchart { nodes, edges })
    };
    let concept = |id: &str, name: &str, definition: &str| Concept {
        id: id.into(),
        name: name.into(),
        definition: definition.into(),
    };

    SlideData {
        title: "Introduction to Computer Science".into(),
        subject: "Computer Science".into(),
        created_at: Utc::now(),
        slides: vec![
            Slide {
                id: 1,
                title: "Introduction to Algorithms".into(),
                content: "An algorithm is a finite sequence of well-defined instructions, typically used to solve a class of specific problems or to perform a computation.".into(),
                summary: "Algorithms are step-by-step procedures for calculations or problem-solving operations. They form the foundation of computer programming and are essential to computer science.".into(),
                key_points: vec![
                    "Algorithms are step-by-step procedures".into(),
                    "They must be finite and well-defined".into(),
                    "Used in problem-solving and computation".into(),
                    "Foundation for all computer programs".into(),
                ],
                concepts: vec![
                    concept("alg1", "Algorithm", "A finite sequence of well-defined instructions"),
                    concept("comp1", "Computation", "The process of calculating or processing information"),
                ],
                questions: vec![
                    Question::multiple_choice(
                        "q1",
                        "What is an algorithm?",
                        vec![
                            "A programming language".into(),
                            "A step-by-step procedure for solving problems".into(),
                            "A type of computer hardware".into(),
                            "A mathematical equation".into(),
                        ],
                        1,
                    ),
                    Question::true_false("q2", "Algorithms can be infinite in length.", false),
                ],
                visual_aid: Some(chain(&[
                    ("start", "Start"),
                    ("step1", "Define Problem"),
                    ("step2", "Design Algorithm"),
                    ("step3", "Implement Solution"),
                    ("step4", "Test & Debug"),
                    ("end", "End"),
                ])),
            },
            Slide {
                id: 2,
                title: "Types of Algorithms".into(),
                content: "There are various types of algorithms including sorting, searching, recursive, divide and conquer, greedy, dynamic programming, and more.".into(),
                summary: "Algorithms can be categorized based on their approach to problem-solving. Common types include sorting algorithms, searching algorithms, recursive algorithms, and more.".into(),
                key_points: vec![
                    "Sorting algorithms arrange data in specific orders".into(),
                    "Searching algorithms find elements in data structures".into(),
                    "Recursive algorithms call themselves to solve subproblems".into(),
                    "Dynamic programming breaks problems into overlapping subproblems".into(),
                ],
                concepts: vec![
                    concept("sort1", "Sorting Algorithm", "An algorithm that arranges elements in a specific order"),
                    concept("search1", "Searching Algorithm", "An algorithm that finds an element in a data structure"),
                ],
                questions: vec![
                    Question::multiple_choice(
                        "q3",
                        "Which of the following is NOT a type of algorithm?",
                        vec![
                            "Sorting algorithm".into(),
                            "Searching algorithm".into(),
                            "Storage algorithm".into(),
                            "Recursive algorithm".into(),
                        ],
                        2,
                    ),
                    Question::true_false(
                        "q4",
                        "Dynamic programming solves problems by breaking them into subproblems.",
                        true,
                    ),
                ],
                visual_aid: Some(star(
                    ("algorithms", "Algorithms"),
                    &[
                        ("sorting", "Sorting"),
                        ("searching", "Searching"),
                        ("recursive", "Recursive"),
                        ("greedy", "Greedy"),
                        ("dp", "Dynamic Programming"),
                    ],
                )),
            },
        ],
    }
}
