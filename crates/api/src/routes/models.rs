use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct Item {
    pub id: i64,
    pub public_id: String,
    pub owner_user_id: i64,
    pub org_id: Option<i64>,
    pub kind: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub occurred_at: String,
    pub show_email: bool,
    pub show_phone: bool,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateItemRequest {
    pub kind: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub occurred_at: String,
    #[serde(default)]
    pub show_email: bool,
    #[serde(default)]
    pub show_phone: bool,
    pub org_id: Option<String>, // public_id
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub occurred_at: Option<String>,
    pub show_email: Option<bool>,
    pub show_phone: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemsResponse {
    pub items: Vec<Item>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemDetailResponse {
    pub item: Item,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct Claim {
    pub id: i64,
    pub public_id: String,
    pub item_id: i64,
    pub claimant_user_id: i64,
    pub evidence: String,
    pub status: String,
    pub review_note: Option<String>,
    pub handover_location: Option<String>,
    pub handover_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateClaimRequest {
    pub evidence: String,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct DecideClaimRequest {
    pub review_note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteClaimRequest {
    pub handover_location: String,
    pub handover_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimsResponse {
    pub claims: Vec<Claim>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClaimResponse {
    pub claim: Claim,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Conversation {
    pub id: i64,
    pub public_id: String,
    pub item_id: i64,
    pub starter_user_id: i64,
    pub owner_user_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ConversationSummary {
    pub id: i64,
    pub public_id: String,
    pub item_public_id: String,
    pub item_title: String,
    pub starter_user_id: i64,
    pub owner_user_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub public_id: String,
    pub conversation_id: i64,
    pub sender_user_id: i64,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation: Conversation,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: Message,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct MarkNotificationReadRequest {
    pub read: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub notification: Notification,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Organization {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrganizationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    pub organization: Organization,
}

#[derive(Debug, Serialize, FromRow)]
pub struct OrganizationMember {
    pub id: i64,
    pub org_id: i64,
    pub user_id: i64,
    pub role: String,
    pub joined_at: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRoleRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub members: Vec<OrganizationMember>,
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub member: OrganizationMember,
}

#[derive(Debug, Serialize, FromRow)]
pub struct OrganizationContact {
    pub id: i64,
    pub org_id: i64,
    pub label: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub label: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContactRequest {
    pub label: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContactsResponse {
    pub contacts: Vec<OrganizationContact>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub contact: OrganizationContact,
}

#[derive(Debug, Serialize, FromRow)]
pub struct OrganizationVerification {
    pub id: i64,
    pub org_id: i64,
    pub submitted_by: i64,
    pub registration_number: String,
    pub document_url: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub reviewed_by: Option<i64>,
    pub review_note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitVerificationRequest {
    pub registration_number: String,
    pub document_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DecideVerificationRequest {
    pub review_note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerificationsResponse {
    pub verifications: Vec<OrganizationVerification>,
}

#[derive(Debug, Serialize)]
pub struct VerificationResponse {
    pub verification: OrganizationVerification,
}

#[derive(Debug, Serialize, FromRow)]
pub struct Contract {
    pub id: i64,
    pub org_id: i64,
    pub title: String,
    pub terms: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateContractRequest {
    pub title: String,
    pub terms: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContractRequest {
    pub title: Option<String>,
    pub terms: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContractsResponse {
    pub contracts: Vec<Contract>,
}

#[derive(Debug, Serialize)]
pub struct ContractResponse {
    pub contract: Contract,
}
