use crate::actions::DataProcessorAction;
use crate::core::{DataProcessor, DataProcessorConfig};
use crate::data::Data;
use crate::errors::{AgentError, Result};
use crate::processor::schema::parse_transform_output;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error};

/// Appended to user code; reads the payload from stdin, calls `convert` and
/// prints the schema line and the value line.
const HARNESS: &str = include_str!("harness.py");

/// Runs `convert(payload)` in a fresh interpreter process per call.
///
/// The payload goes in as JSON on stdin; nothing else is shared with the
/// child. A non-zero exit or any output other than the two protocol lines
/// fails the call with the child's stderr attached.
pub struct SubprocessDataProcessor {
    interpreter: String,
}

impl SubprocessDataProcessor {
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    pub fn from_config(config: &DataProcessorConfig) -> Self {
        Self::new(config.interpreter.clone())
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    async fn run_python(&self, code: &str, payload: &Data) -> Result<Data> {
        let input = serde_json::to_vec(&payload.to_transport()?)?;
        let script = format!("{}\n{}", code, HARNESS);

        let mut child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(&script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AgentError::transform(
                    format!("cannot start interpreter '{}'", self.interpreter),
                    e.to_string(),
                )
            })?;

        // fed from its own task so a child that prints before reading its
        // input cannot fill the stdout pipe and stall both sides
        let feeder = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                // a child that dies before reading closes the pipe; its stderr says why
                if let Err(e) = stdin.write_all(&input).await {
                    debug!("transform stdin closed early: {}", e);
                }
            })
        });

        let output = child.wait_with_output().await?;
        if let Some(feeder) = feeder {
            if let Err(e) = feeder.await {
                debug!("transform stdin writer stopped: {}", e);
            }
        }
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            error!("transform failed ({}):\n{}", output.status, stderr);
            return Err(AgentError::transform(
                format!("transform exited with {}", output.status),
                stderr,
            ));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| AgentError::transform("transform output is not UTF-8", e.to_string()))?;
        let (schema, value) = parse_transform_output(&stdout).map_err(|e| {
            error!("transform produced malformed output: {}", e);
            e
        })?;

        let data = schema.build(value)?;
        debug!("transform produced {}", data.type_id());
        Ok(data)
    }
}

#[async_trait]
impl DataProcessor for SubprocessDataProcessor {
    async fn run(&self, action: &DataProcessorAction, payload: Data) -> Result<Data> {
        match action {
            DataProcessorAction::PythonCode(python) => self.run_python(&python.code, &payload).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Element, ElementSequence};
    use serde_json::json;
    use url::Url;

    fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn python_code(code: &str) -> DataProcessorAction {
        match crate::actions::CoreAction::python_code(code, crate::actions::PayloadRef::memory()) {
            crate::actions::CoreAction::DataProcessor(action) => action.action,
            _ => unreachable!(),
        }
    }

    fn payload() -> Data {
        let url = Url::parse("http://fixture.test/index.html").unwrap();
        Data::Elements(ElementSequence::new(vec![
            Element::new(url.clone(), r#"<li class="list-item">one</li>"#).unwrap(),
            Element::new(url, r#"<li class="list-item">two</li>"#).unwrap(),
        ]))
    }

    #[tokio::test]
    async fn test_convert_to_typed_records() {
        if !python_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let code = r#"
from dataclasses import dataclass

@dataclass
class Item:
    text: str
    tag: str

@dataclass
class Items:
    items: list
    count: int

def convert(payload):
    items = [Item(text=e.text, tag=e.tag_name) for e in payload.elements]
    return Items(items=items, count=len(items))
"#;
        let processor = SubprocessDataProcessor::new("python3");
        let data = processor.run(&python_code(code), payload()).await.unwrap();
        assert_eq!(data.type_id(), "Items");
        assert_eq!(data.attribute("count").unwrap(), Data::Value(json!(2)));
        let items = data.attribute("items").unwrap().into_items().unwrap();
        assert_eq!(items[0].type_id(), "Item");
        assert_eq!(items[1].attribute("text").unwrap(), Data::Value(json!("two")));
        assert_eq!(items[1].attribute("tag").unwrap(), Data::Value(json!("li")));
    }

    #[tokio::test]
    async fn test_exception_surfaces_stderr() {
        if !python_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let code = "def convert(payload):\n    raise ValueError('bad payload')\n";
        let processor = SubprocessDataProcessor::new("python3");
        match processor.run(&python_code(code), payload()).await {
            Err(AgentError::TransformFailed { diagnostics, .. }) => {
                assert!(diagnostics.contains("ValueError: bad payload"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stray_output_breaks_protocol() {
        if !python_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let code = "def convert(payload):\n    print('debugging')\n    return {'n': 1}\n";
        let processor = SubprocessDataProcessor::new("python3");
        assert!(matches!(
            processor.run(&python_code(code), payload()).await,
            Err(AgentError::TransformFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_chatty_import_with_large_payload_completes() {
        if !python_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let code = r#"
import sys
sys.stderr.write("x" * 262144)
sys.stderr.flush()

def convert(payload):
    return {"count": len(payload.elements)}
"#;
        let url = Url::parse("http://fixture.test/index.html").unwrap();
        let filler = "y".repeat(1000);
        let elements = (0..300)
            .map(|i| Element::new(url.clone(), format!("<li>{} {}</li>", i, filler)).unwrap())
            .collect();
        let payload = Data::Elements(ElementSequence::new(elements));

        let processor = SubprocessDataProcessor::new("python3");
        let source = python_code(code);
        let run = processor.run(&source, payload);
        let data = tokio::time::timeout(std::time::Duration::from_secs(60), run)
            .await
            .expect("transform stalled")
            .unwrap();
        assert_eq!(data.attribute("count").unwrap(), Data::Value(json!(300)));
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let processor = SubprocessDataProcessor::new("definitely-not-an-interpreter");
        let code = "def convert(payload):\n    return {}\n";
        assert!(matches!(
            processor.run(&python_code(code), payload()).await,
            Err(AgentError::TransformFailed { .. })
        ));
    }
}
