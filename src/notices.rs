/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: notices.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-10-17 10:12:05
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-10-17 10:40:31
 */

use crate::traits::UserNotices;
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Error,
    Warning,
    Message,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeLevel::Error => write!(f, "error"),
            NoticeLevel::Warning => write!(f, "warning"),
            NoticeLevel::Message => write!(f, "message"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// Keeps user notices in the order they were raised until someone drains them.
#[derive(Debug, Default)]
pub struct NoticeLog {
    entries: Mutex<Vec<Notice>>,
}

impl NoticeLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: NoticeLevel, text: &str) {
        // A poisoned lock only means another writer panicked mid-push
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(Notice {
            level,
            text: text.to_string(),
        });
    }

    pub fn drain(&self) -> Vec<Notice> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::take(&mut *entries)
    }

    #[allow(dead_code)]
    pub fn snapshot(&self) -> Vec<Notice> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl UserNotices for NoticeLog {
    fn error(&self, text: &str) {
        self.push(NoticeLevel::Error, text);
    }

    fn warning(&self, text: &str) {
        self.push(NoticeLevel::Warning, text);
    }

    fn message(&self, text: &str) {
        self.push(NoticeLevel::Message, text);
    }
}
