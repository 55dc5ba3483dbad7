pub mod base;
pub mod web;

pub use base::{
    CoreAction, DataProcessorAction, DataProcessorCoreAction, GenerateIdCoreAction, PayloadRef,
    PythonCodeAction, SaveDataAction, SequentialCoreAction, StorageAction, StorageCoreAction,
    WebAgentCoreAction,
};
pub use web::{
    ClickSelectedElementAction, EnclosingTextSelector, OpenUrlAction, RectangleSelector, Selector,
    SetSelectorAction, WebAgentAction, XPathSelector,
};
