//! Notification templates

use quick_xml::escape::escape;
use std::time::Duration;

use super::Notification;

/// Success message carrying the download link.
pub fn translation_ready(
    to: &str,
    file_id: &str,
    file_name: &str,
    download_url: &str,
    link_ttl: Duration,
) -> Notification {
    let html_body = format!(
        "<html>\n<body>\n\
         <p>Your translated file for file {} is ready for download. \
         You can download it using the following link:</p>\n\
         <p><a href=\"{}\">Download Translated File</a></p>\n\
         <p>The link will expire in {}.</p>\n\
         </body>\n</html>\n",
        escape(file_name),
        escape(download_url),
        describe_duration(link_ttl)
    );

    Notification {
        to: to.to_string(),
        subject: format!("Translation Completed - {}", file_id),
        html_body,
    }
}

/// Failure message; carries no link.
pub fn translation_failed(to: &str, file_name: &str, reason: &str) -> Notification {
    let html_body = format!(
        "<html>\n<body>\n\
         <p>The translation of file {} has failed.</p>\n\
         <p>Reason: {}</p>\n\
         </body>\n</html>\n",
        escape(file_name),
        escape(reason)
    );

    Notification {
        to: to.to_string(),
        subject: format!("Translation Failed - {}", file_name),
        html_body,
    }
}

/// "1 hour", "10 minutes", "90 seconds".
pub fn describe_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (value, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };

    if value == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", value, unit)
    }
}
