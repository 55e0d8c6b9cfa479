pub mod tests;

use crate::model::Model;
use crate::transpiler::errors::{CodegenError, ScriptError};
use crate::transpiler::script::{Evaluator, Program, parse_program};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const OPEN_TAG: &str = "<%";
const CLOSE_TAG: &str = "%>";

/// One piece of raw template text, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<'t> {
    Literal(&'t str),
    /// `<%= expr %>`
    Expression(&'t str),
    /// `<% stmt %>`
    Code(&'t str),
}

/// Splits a template into literal text and tags, left to right.
pub fn scan_segments(source: &str) -> Result<Vec<Segment<'_>>, ScriptError> {
    let mut segments = Vec::new();
    let mut rest = source;
    let mut offset = 0;

    while let Some(start) = rest.find(OPEN_TAG) {
        if start > 0 {
            segments.push(Segment::Literal(&rest[..start]));
        }
        let body = &rest[start + OPEN_TAG.len()..];
        let end = body
            .find(CLOSE_TAG)
            .ok_or(ScriptError::UnterminatedTag(offset + start))?;

        match body[..end].strip_prefix('=') {
            Some(expr) => segments.push(Segment::Expression(expr.trim())),
            None => segments.push(Segment::Code(body[..end].trim())),
        }

        let consumed = start + OPEN_TAG.len() + end + CLOSE_TAG.len();
        offset += consumed;
        rest = &rest[consumed..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }

    Ok(segments)
}

/// Rewrites a template into one program: literal chunks become `@text(i)`
/// references into the returned chunk table, expression tags become
/// `@emit(..)` and code tags are spliced in as they are.
fn rewrite(segments: &[Segment<'_>]) -> (String, Vec<String>) {
    let mut program = String::new();
    let mut chunks = Vec::new();

    for segment in segments {
        match segment {
            Segment::Literal(text) => {
                let _ = writeln!(program, "@text({});", chunks.len());
                chunks.push(text.to_string());
            }
            Segment::Expression(expr) => {
                let _ = writeln!(program, "@emit({});", expr);
            }
            // The newline ends any trailing `//` comment inside the tag.
            Segment::Code(code) => {
                let _ = writeln!(program, "{}", code);
            }
        }
    }

    (program, chunks)
}

#[derive(Debug)]
enum Body {
    Ready { program: Program, chunks: Vec<String> },
    Failed(CodegenError),
}

/// A template compiled once and rendered many times.
#[derive(Debug)]
pub struct CompiledTemplate {
    body: Body,
}

impl CompiledTemplate {
    fn compile(source: &str) -> Self {
        let body = scan_segments(source)
            .and_then(|segments| {
                let (text, chunks) = rewrite(&segments);
                parse_program(&text).map(|program| Body::Ready { program, chunks })
            })
            .unwrap_or_else(|e| Body::Failed(CodegenError::TemplateCompile(e)));
        Self { body }
    }

    pub fn compile_error(&self) -> Option<&CodegenError> {
        match &self.body {
            Body::Failed(err) => Some(err),
            Body::Ready { .. } => None,
        }
    }

    /// Renders `model`. Every model key is bound as a name, and `model`
    /// refers to the whole node.
    pub fn try_render(&self, model: &Model) -> Result<String, CodegenError> {
        let (program, chunks) = match &self.body {
            Body::Ready { program, chunks } => (program, chunks),
            Body::Failed(err) => return Err(err.clone()),
        };

        let value = model.to_value();
        let mut bindings: HashMap<_, _> = value
            .as_map()
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        bindings.insert("model".to_string(), value);

        let mut evaluator = Evaluator::with_chunks(bindings, chunks);
        evaluator
            .run(program)
            .map_err(CodegenError::TemplateRender)?;
        Ok(evaluator.into_output())
    }

    /// Like [`try_render`](Self::try_render), with failures reported as
    /// `Error: ...` text.
    pub fn render(&self, model: &Model) -> String {
        self.try_render(model).unwrap_or_else(|err| {
            tracing::error!(error = %err, "template failed");
            format!("Error: {}", err)
        })
    }
}

/// Compiled templates keyed by their exact source text.
///
/// Clones share the same storage, so one cache can be created per process
/// and handed to every engine. Entries are never evicted.
#[derive(Debug, Clone, Default)]
pub struct TemplateCache {
    entries: Arc<RwLock<HashMap<String, Arc<CompiledTemplate>>>>,
    compilations: Arc<AtomicUsize>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Number of times a template source was actually compiled.
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    pub fn get_or_compile(&self, source: &str) -> Arc<CompiledTemplate> {
        if let Some(compiled) = self.entries.read().get(source) {
            tracing::debug!(len = source.len(), "template cache hit");
            return Arc::clone(compiled);
        }

        tracing::debug!(len = source.len(), "template cache miss");
        let compiled = Arc::new(CompiledTemplate::compile(source));
        self.compilations.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = compiled.compile_error() {
            tracing::error!(error = %err, "template compilation failed");
        }

        // A concurrent compile of the same source may have landed first;
        // keep that one so every caller sees a single unit.
        let mut entries = self.entries.write();
        Arc::clone(entries.entry(source.to_string()).or_insert(compiled))
    }
}

/// Compiles and renders templates through a shared [`TemplateCache`].
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    cache: TemplateCache,
}

impl TemplateEngine {
    pub fn new(cache: TemplateCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.cache
    }

    pub fn compile(&self, source: &str) -> Arc<CompiledTemplate> {
        self.cache.get_or_compile(source)
    }

    pub fn try_render(&self, source: &str, model: &Model) -> Result<String, CodegenError> {
        self.compile(source).try_render(model)
    }

    /// Renders `model` through `source`. Never fails: compile and render
    /// errors come back as `Error: Could not ... template - <reason>`.
    pub fn render(&self, source: &str, model: &Model) -> String {
        self.compile(source).render(model)
    }
}
