//! 预导入模块，方便使用

pub use super::announcements::{
    ActiveModel as AnnouncementActiveModel, Entity as Announcements, Model as AnnouncementModel,
};
pub use super::badges::{ActiveModel as BadgeActiveModel, Entity as Badges, Model as BadgeModel};
pub use super::courses::{ActiveModel as CourseActiveModel, Entity as Courses, Model as CourseModel};
pub use super::credit_transactions::{
    ActiveModel as CreditTransactionActiveModel, Entity as CreditTransactions,
    Model as CreditTransactionModel,
};
pub use super::progress::{
    ActiveModel as ProgressActiveModel, Entity as ProgressRecords, Model as ProgressModel,
};
pub use super::study_materials::{
    ActiveModel as StudyMaterialActiveModel, Entity as StudyMaterials,
    Model as StudyMaterialModel,
};
pub use super::submissions::{
    ActiveModel as SubmissionActiveModel, Entity as Submissions, Model as SubmissionModel,
};
pub use super::support_tickets::{
    ActiveModel as SupportTicketActiveModel, Entity as SupportTickets,
    Model as SupportTicketModel,
};
pub use super::ticket_replies::{
    ActiveModel as TicketReplyActiveModel, Entity as TicketReplies, Model as TicketReplyModel,
};
pub use super::users::{ActiveModel as UserActiveModel, Entity as Users, Model as UserModel};
