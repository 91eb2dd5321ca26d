/*

00:00:00 Intro
00:01:30 Chapter 2
00:05:12.250 Listener questions

*/

pub mod chapter;
pub mod chapters;
pub mod config;
pub mod editor;
pub mod events;
pub mod export;
pub mod mkv;
pub mod paste;
pub mod player;
pub mod session;
pub mod text;
pub mod timecode;

pub use chapter::{Chapter, ChapterFault, ChapterId, ChapterPatch};
pub use chapters::ChapterList;
pub use config::EditorConfig;
pub use editor::ChapterEditor;
pub use events::ListenerId;
pub use export::{EpisodeTags, ExportFormat};
