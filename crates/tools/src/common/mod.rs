//! ツール間で共有する I/O 補助

pub mod io;
