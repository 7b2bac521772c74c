//! Model gateway implementations for localmind.
//!
//! All providers implement the `localmind_core::Provider` trait. The local
//! inference servers localmind targets (vLLM, llama.cpp server, Ollama) all
//! expose the OpenAI chat-completions wire format, so one client covers them.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
