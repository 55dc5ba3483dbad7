use crate::actions::web::{Selector, WebAgentAction};
use crate::types::EntityMeta;
use serde::{Deserialize, Serialize};
use url::Url;

/// Top-level instruction dispatched by [`crate::pipeline::Core`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoreAction {
    GenerateId(GenerateIdCoreAction),
    WebAgent(WebAgentCoreAction),
    DataProcessor(DataProcessorCoreAction),
    Storage(StorageCoreAction),
    Sequential(SequentialCoreAction),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateIdCoreAction {
    #[serde(flatten)]
    pub meta: EntityMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebAgentCoreAction {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub action: WebAgentAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProcessorCoreAction {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub action: DataProcessorAction,
    pub payload: PayloadRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageCoreAction {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub action: StorageAction,
    #[serde(default)]
    pub payload: Option<PayloadRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequentialCoreAction {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub actions: Vec<CoreAction>,
}

/// Where an action takes its input from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayloadRef {
    Memory {
        #[serde(default)]
        attribute: Option<String>,
        #[serde(default)]
        expand: Option<bool>,
    },
    SelectedElement,
    SelectedElements,
}

impl PayloadRef {
    pub fn memory() -> Self {
        PayloadRef::Memory {
            attribute: None,
            expand: None,
        }
    }

    pub fn memory_attribute(attribute: impl Into<String>) -> Self {
        PayloadRef::Memory {
            attribute: Some(attribute.into()),
            expand: None,
        }
    }

    pub fn expand(attribute: impl Into<String>) -> Self {
        PayloadRef::Memory {
            attribute: Some(attribute.into()),
            expand: Some(true),
        }
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self, PayloadRef::Memory { expand: Some(true), .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataProcessorAction {
    PythonCode(PythonCodeAction),
}

/// User code defining `convert(payload)`, run out of process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PythonCodeAction {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageAction {
    SaveData(SaveDataAction),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDataAction {
    #[serde(flatten)]
    pub meta: EntityMeta,
}

impl StorageAction {
    pub fn save_data() -> Self {
        StorageAction::SaveData(SaveDataAction {
            meta: EntityMeta::new(),
        })
    }
}

impl CoreAction {
    pub fn generate_id() -> Self {
        CoreAction::GenerateId(GenerateIdCoreAction {
            meta: EntityMeta::new(),
        })
    }

    pub fn web_agent(action: WebAgentAction) -> Self {
        CoreAction::WebAgent(WebAgentCoreAction {
            meta: EntityMeta::new(),
            action,
        })
    }

    pub fn open_url(url: Url) -> Self {
        Self::web_agent(WebAgentAction::open_url(url))
    }

    pub fn set_selector(selector: Selector) -> Self {
        Self::web_agent(WebAgentAction::set_selector(selector))
    }

    pub fn click_selected_element() -> Self {
        Self::web_agent(WebAgentAction::click_selected_element())
    }

    pub fn python_code(code: impl Into<String>, payload: PayloadRef) -> Self {
        CoreAction::DataProcessor(DataProcessorCoreAction {
            meta: EntityMeta::new(),
            action: DataProcessorAction::PythonCode(PythonCodeAction {
                meta: EntityMeta::new(),
                code: code.into(),
            }),
            payload,
        })
    }

    pub fn save_data(payload: Option<PayloadRef>) -> Self {
        CoreAction::Storage(StorageCoreAction {
            meta: EntityMeta::new(),
            action: StorageAction::save_data(),
            payload,
        })
    }

    pub fn sequential(actions: Vec<CoreAction>) -> Self {
        CoreAction::Sequential(SequentialCoreAction {
            meta: EntityMeta::new(),
            actions,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            CoreAction::GenerateId(_) => "generate_id",
            CoreAction::WebAgent(_) => "web_agent",
            CoreAction::DataProcessor(_) => "data_processor",
            CoreAction::Storage(_) => "storage",
            CoreAction::Sequential(_) => "sequential",
        }
    }

    pub fn meta(&self) -> &EntityMeta {
        match self {
            CoreAction::GenerateId(a) => &a.meta,
            CoreAction::WebAgent(a) => &a.meta,
            CoreAction::DataProcessor(a) => &a.meta,
            CoreAction::Storage(a) => &a.meta,
            CoreAction::Sequential(a) => &a.meta,
        }
    }
}
