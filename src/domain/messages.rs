//! User-facing copy. Localized (Arabic) text keyed by error kind.
//!
//! Records carry developer-oriented messages; anything shown to an end user goes
//! through [`user_message`] or [`fallback_copy`].

use crate::domain::{ErrorKind, ErrorRecord};

/// Localized override for a kind, if the catalog has one.
pub fn localized_message(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::Network => Some("لا يوجد اتصال بالإنترنت. يرجى التحقق من الاتصال."),
        ErrorKind::Timeout => Some("انتهت مهلة الاتصال بالخادم. حاول مرة أخرى."),
        ErrorKind::Unauthorized => Some("غير مصرح لك بالوصول. يرجى تسجيل الدخول."),
        ErrorKind::Forbidden => Some("ليس لديك صلاحية للقيام بهذا الإجراء."),
        ErrorKind::NotFound => Some("العنصر المطلوب غير موجود."),
        ErrorKind::ServerError => Some("حدث خطأ في الخادم. يرجى المحاولة لاحقاً."),
        ErrorKind::SessionExpired => Some("انتهت صلاحية الجلسة. يرجى تسجيل الدخول مرة أخرى."),
        // Validation, Api, Data, Auth, ExternalService and Unknown carry specific text.
        _ => None,
    }
}

/// Message safe to show the user: the localized override or the record's own message.
pub fn user_message(record: &ErrorRecord) -> String {
    localized_message(record.kind)
        .map(str::to_string)
        .unwrap_or_else(|| record.message.clone())
}

/// Title and help text for the recovery surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackCopy {
    pub title: &'static str,
    pub help: &'static str,
}

pub const CONNECTIVITY_COPY: FallbackCopy = FallbackCopy {
    title: "مشكلة في الاتصال",
    help: "تحقق من اتصالك بالإنترنت ثم أعد المحاولة.",
};

pub const RETRY_LATER_COPY: FallbackCopy = FallbackCopy {
    title: "خطأ في الخادم",
    help: "الخدمة غير متاحة حالياً. يرجى المحاولة بعد قليل.",
};

pub const REAUTHENTICATE_COPY: FallbackCopy = FallbackCopy {
    title: "انتهت الجلسة",
    help: "يرجى تسجيل الدخول مرة أخرى للمتابعة.",
};

pub const CORRECT_INPUT_COPY: FallbackCopy = FallbackCopy {
    title: "بيانات غير صالحة",
    help: "يرجى مراجعة البيانات المدخلة وتصحيحها.",
};

pub const GENERIC_COPY: FallbackCopy = FallbackCopy {
    title: "حدث خطأ غير متوقع",
    help: "نعتذر عن هذا الخطأ. أعد المحاولة أو تواصل مع الدعم الفني.",
};

pub fn fallback_copy(kind: ErrorKind) -> FallbackCopy {
    match kind {
        ErrorKind::Network => CONNECTIVITY_COPY,
        ErrorKind::Api | ErrorKind::ServerError => RETRY_LATER_COPY,
        ErrorKind::Auth | ErrorKind::SessionExpired => REAUTHENTICATE_COPY,
        ErrorKind::Validation => CORRECT_INPUT_COPY,
        _ => GENERIC_COPY,
    }
}
