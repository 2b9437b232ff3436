// Weft Core Library
// Role-templated dialogue rendering and resilient chat-completions dispatch

pub mod dialogue;
pub mod dispatch;
pub mod template;
pub mod tools;

// Export core types
pub use dialogue::{Dialogue, Message, Turn, ASSISTANT, ENVIRONMENT, SYSTEM, USER};
pub use dispatch::{
    ChatClient, ChatRequest, ClientConfig, DispatchError, DispatchResult, GenerationParams,
    KeyRing, ModelFamily, OrgRing, MAX_COMPLETION_TOKENS, OPENAI_API_BASE,
};
pub use template::{BeginSpec, PromptTemplate, RoleSpec, RoleTable, TemplateError};
